//! Criterion benchmarks for the terrain core.
//!
//! Benchmarks:
//!   - set_height on 256x256 and 1024x1024 fields (height copy + normal rebuild)
//!   - frustum culling of a 1024x1024, 4-level tree from an oblique camera
//!   - picking: a cursor ray that hits, and one that misses upward
//!
//! Run with: cargo bench -p terrain --bench terrain_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bevy::prelude::*;
use bevy::render::primitives::Frustum;

use terrain::{HeightSource, Terrain, TerrainSettings, TerrainTransform};

fn ridged_heights(dimension: u32) -> Vec<f32> {
    (0..dimension * dimension)
        .map(|i| {
            let x = (i % dimension) as f32 / dimension as f32;
            let y = (i / dimension) as f32 / dimension as f32;
            (0.5 + 0.3 * (x * 17.0).sin() * (y * 11.0).cos()).clamp(0.0, 1.0)
        })
        .collect()
}

fn camera_frustum(eye: Vec3, target: Vec3) -> Frustum {
    let view = Mat4::look_at_rh(eye, target, Vec3::Y);
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 10_000.0);
    Frustum::from_clip_from_world(&(projection * view))
}

// ---------------------------------------------------------------------------
// Benchmark: set_height
// ---------------------------------------------------------------------------

fn bench_set_height(c: &mut Criterion) {
    let mut group = c.benchmark_group("terrain_set_height");
    group.sample_size(20);

    for dimension in [256u32, 1024] {
        let heights = ridged_heights(dimension);
        let mut terrain = Terrain::new(&TerrainSettings::new(dimension, 3)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(dimension), &heights, |b, heights| {
            b.iter(|| {
                terrain
                    .set_height(HeightSource::Samples(black_box(heights)))
                    .unwrap()
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: culling
// ---------------------------------------------------------------------------

fn bench_cull(c: &mut Criterion) {
    let mut group = c.benchmark_group("terrain_cull");

    let settings = TerrainSettings::new(1024, 4);
    let terrain = Terrain::from_source(&settings, HeightSource::Samples(&ridged_heights(1024))).unwrap();
    let frustum = camera_frustum(Vec3::new(-200.0, 1500.0, -200.0), Vec3::new(400.0, 0.0, 400.0));

    // 256 leaves; the oblique view keeps only part of the grid.
    group.bench_function("1024_levels_4_oblique", |b| {
        b.iter(|| {
            let mut count = 0usize;
            terrain.visit_visible(&TerrainTransform::IDENTITY, black_box(&frustum), |_| count += 1);
            black_box(count)
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: picking
// ---------------------------------------------------------------------------

fn bench_pick(c: &mut Criterion) {
    let mut group = c.benchmark_group("terrain_pick");

    let settings = TerrainSettings::new(256, 3);
    let terrain = Terrain::from_source(&settings, HeightSource::Samples(&ridged_heights(256))).unwrap();
    let eye = Vec3::new(-64.0, 900.0, -64.0);

    let hit_ray = Ray3d {
        origin: eye,
        direction: Dir3::new(Vec3::new(192.0, -700.0, 192.0)).unwrap(),
    };
    group.bench_function("hit_oblique", |b| {
        b.iter(|| black_box(terrain.pick(&TerrainTransform::IDENTITY, black_box(hit_ray), eye)));
    });

    // No candidates: the broad phase rejects it at the root.
    let miss_ray = Ray3d {
        origin: eye,
        direction: Dir3::Y,
    };
    group.bench_function("miss_upward", |b| {
        b.iter(|| black_box(terrain.pick(&TerrainTransform::IDENTITY, black_box(miss_ray), eye)));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Register groups
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_set_height, bench_cull, bench_pick);
criterion_main!(benches);
