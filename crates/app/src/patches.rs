//! One mesh entity per quad-tree leaf, shown or hidden from the terrain's
//! [`VisibleLeaves`] each frame.

use std::collections::HashMap;

use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;

use terrain::{GridRect, HeightField, HeightSource, Terrain, TerrainSettings, VisibleLeaves};

use crate::heightmap::generate_heights;

const INITIAL_SEED: i32 = 1337;

const LOW_COLOR: [f32; 4] = [0.24, 0.42, 0.18, 1.0];
const HIGH_COLOR: [f32; 4] = [0.78, 0.74, 0.66, 1.0];

#[derive(Component)]
pub struct TerrainPatch {
    pub rect: GridRect,
}

/// Seed of the current height source.
#[derive(Resource)]
pub struct TerrainSeed(pub i32);

impl Default for TerrainSeed {
    fn default() -> Self {
        Self(INITIAL_SEED)
    }
}

fn height_color(t: f32) -> [f32; 4] {
    let t = t.clamp(0.0, 1.0);
    std::array::from_fn(|i| LOW_COLOR[i] + (HIGH_COLOR[i] - LOW_COLOR[i]) * t)
}

/// Builds the mesh for the patch covering `rect`, relative to the patch origin.
///
/// Vertex `(x, y)` sits at the corner of cell `(x, y)` and takes that cell's
/// height and normal; the far edge reuses the clamped neighbor.
pub fn build_patch_mesh(field: &HeightField, rect: GridRect) -> Mesh {
    let (w, h) = (rect.width, rect.height);
    let verts = ((w + 1) * (h + 1)) as usize;
    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(verts);
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(verts);
    let mut colors: Vec<[f32; 4]> = Vec::with_capacity(verts);
    let mut uvs: Vec<[f32; 2]> = Vec::with_capacity(verts);
    let mut indices: Vec<u32> = Vec::with_capacity((w * h * 6) as usize);

    let (lo, hi) = field.height_range();
    let span = (hi - lo).max(f32::EPSILON);
    let dim = field.dimension() as f32;

    for ly in 0..=h {
        for lx in 0..=w {
            let gx = (rect.x + lx) as i32;
            let gy = (rect.y + ly) as i32;
            let height = field.get_height(gx, gy);
            positions.push([lx as f32, height * field.height_scale(), ly as f32]);
            normals.push(field.get_normal(gx, gy).to_array());
            colors.push(height_color((height - lo) / span));
            uvs.push([gx as f32 / dim, gy as f32 / dim]);
        }
    }

    let row = w + 1;
    for ly in 0..h {
        for lx in 0..w {
            let tl = ly * row + lx;
            let tr = tl + 1;
            let bl = tl + row;
            let br = bl + 1;
            // Two triangles: TL-BR-TR and TL-BL-BR
            indices.extend_from_slice(&[tl, br, tr, tl, bl, br]);
        }
    }

    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
    .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
    .with_inserted_indices(Indices::U32(indices))
}

pub fn spawn_terrain(
    mut commands: Commands,
    settings: Res<TerrainSettings>,
    seed: Res<TerrainSeed>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let heights = generate_heights(settings.dimension, seed.0);
    let terrain = match Terrain::from_source(&settings, HeightSource::Samples(&heights)) {
        Ok(terrain) => terrain,
        Err(err) => {
            error!("Cannot build terrain: {err}");
            return;
        }
    };

    let material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 0.9,
        ..default()
    });
    for leaf in terrain.index().leaves() {
        commands.spawn((
            Mesh3d(meshes.add(build_patch_mesh(terrain.height_field(), leaf.rect))),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(leaf.translation),
            Visibility::Hidden,
            TerrainPatch { rect: leaf.rect },
        ));
    }
    info!("Spawned {} terrain patches", terrain.index().leaf_count());

    commands.spawn((terrain, Transform::IDENTITY));
}

/// Mirrors last frame's culling result onto the patch entities.
pub fn sync_patch_visibility(
    terrains: Query<&VisibleLeaves, With<Terrain>>,
    mut patches: Query<(&TerrainPatch, &mut Visibility, &mut Transform)>,
) {
    let Ok(visible) = terrains.get_single() else {
        return;
    };
    let draws: HashMap<GridRect, _> = visible.leaves.iter().map(|d| (d.rect, d)).collect();

    for (patch, mut visibility, mut transform) in &mut patches {
        match draws.get(&patch.rect) {
            Some(draw) => {
                visibility.set_if_neq(Visibility::Inherited);
                let placed = Transform {
                    translation: draw.world_transform.translation,
                    rotation: Quat::IDENTITY,
                    scale: draw.world_transform.scale,
                };
                transform.set_if_neq(placed);
            }
            None => {
                visibility.set_if_neq(Visibility::Hidden);
            }
        }
    }
}

/// `R`: new random seed, new heights, rebuilt patch meshes.
pub fn regenerate_on_key(
    keys: Res<ButtonInput<KeyCode>>,
    mut seed: ResMut<TerrainSeed>,
    mut terrains: Query<&mut Terrain>,
    patches: Query<(&TerrainPatch, &Mesh3d)>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    if !keys.just_pressed(KeyCode::KeyR) {
        return;
    }
    let Ok(mut terrain) = terrains.get_single_mut() else {
        return;
    };

    seed.0 = rand::random();
    let heights = generate_heights(terrain.dimension(), seed.0);
    if terrain.set_height(HeightSource::Samples(&heights)).is_err() {
        return;
    }
    for (patch, mesh) in &patches {
        meshes.insert(&mesh.0, build_patch_mesh(terrain.height_field(), patch.rect));
    }
    info!("Regenerated terrain with seed {}", seed.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::render::mesh::VertexAttributeValues;

    fn sloped_field() -> HeightField {
        let mut field = HeightField::new(8, 0.25).unwrap();
        let src: Vec<f32> = (0..64).map(|i| (i % 8) as f32 / 8.0).collect();
        field.set_height(HeightSource::Samples(&src)).unwrap();
        field
    }

    #[test]
    fn test_patch_mesh_vertex_and_index_counts() {
        let field = sloped_field();
        let mesh = build_patch_mesh(&field, GridRect::new(4, 0, 4, 4));
        assert_eq!(mesh.count_vertices(), 25);
        assert_eq!(mesh.indices().map(|i| i.len()), Some(4 * 4 * 6));
    }

    #[test]
    fn test_patch_mesh_positions_are_patch_local() {
        let field = sloped_field();
        let mesh = build_patch_mesh(&field, GridRect::new(4, 4, 4, 4));
        let Some(VertexAttributeValues::Float32x3(positions)) = mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            panic!("missing positions");
        };
        // First vertex is cell (4, 4): height 4/8 at scale 32.
        assert_eq!(positions[0], [0.0, 16.0, 0.0]);
        // Last vertex clamps to cell (7, 7).
        assert_eq!(positions[24], [4.0, field.get_height(7, 7) * 32.0, 4.0]);
    }

    #[test]
    fn test_height_color_endpoints() {
        assert_eq!(height_color(0.0), LOW_COLOR);
        assert_eq!(height_color(-3.0), LOW_COLOR);
        let top = height_color(1.0);
        for i in 0..4 {
            assert!((top[i] - HIGH_COLOR[i]).abs() < 1e-6, "got: {top:?}");
        }
    }
}
