//! Two-phase ray/terrain intersection.
//!
//! Broad phase: descend the quad-tree testing each node's world box against the
//! ray and collect intersected leaves with their entry distance.
//! Narrow phase: march the ray through the height field in the nearest leaf's
//! local frame, one world unit per step, and report the step just before the
//! ray crosses the surface. Only the nearest candidate is marched; if it runs
//! out of steps the whole pick is a miss.

use bevy::math::bounding::RayCast3d;
use bevy::prelude::*;

use crate::config::PICK_STEP_LENGTH;
use crate::height_field::HeightField;
use crate::quad_index::{QuadIndex, QuadNode};
use crate::transform::TerrainTransform;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickResult {
    /// Distance from the viewer to `world_position`; `None` on a miss.
    pub distance: Option<f32>,
    pub world_position: Vec3,
    /// Hit cell normalized into `[0, 1]^2`.
    pub map_position: Vec2,
}

impl Default for PickResult {
    fn default() -> Self {
        Self::miss()
    }
}

impl PickResult {
    pub const fn miss() -> Self {
        Self {
            distance: None,
            world_position: Vec3::ZERO,
            map_position: Vec2::ZERO,
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.distance.is_some()
    }
}

/// A leaf whose world box the ray enters at `entry` world units from its origin.
#[derive(Debug, Clone, Copy)]
pub struct PickCandidate<'a> {
    pub leaf: &'a QuadNode,
    pub entry: f32,
}

/// Broad phase: every leaf whose conservative box the ray intersects, nearest first.
pub fn collect_candidates<'a>(
    index: &'a QuadIndex,
    world_transform: &TerrainTransform,
    ray: Ray3d,
) -> Vec<PickCandidate<'a>> {
    let cast = RayCast3d::from_ray(ray, f32::MAX);
    let mut candidates = Vec::new();
    collect_node(index.root(), world_transform, &cast, &mut candidates);
    candidates.sort_by(|a, b| a.entry.total_cmp(&b.entry));
    candidates
}

fn collect_node<'a>(
    node: &'a QuadNode,
    world_transform: &TerrainTransform,
    cast: &RayCast3d,
    out: &mut Vec<PickCandidate<'a>>,
) {
    let node_world = world_transform.child(node.translation);
    let Some(entry) = cast.aabb_intersection_at(&node_world.world_aabb3d(&node.bounds)) else {
        return;
    };
    match &node.children {
        Some(children) => {
            for child in children.iter() {
                collect_node(child, world_transform, cast, out);
            }
        }
        None => out.push(PickCandidate { leaf: node, entry }),
    }
}

/// Surface crossing found by [`march_leaf`], in the leaf's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchHit {
    pub local_position: Vec3,
    /// Grid cell under `local_position`.
    pub cell: IVec2,
}

/// Narrow phase for a single leaf.
///
/// Steps outside the grid are skipped rather than aborting, so a ray can
/// re-enter the footprint; the walk ends after `max_steps` either way.
pub fn march_leaf(
    field: &HeightField,
    leaf: &QuadNode,
    leaf_world: &TerrainTransform,
    ray: Ray3d,
    max_steps: u32,
) -> Option<MarchHit> {
    let dim = field.dimension() as i32;
    let step = leaf_world.inverse_transform_vector(*ray.direction * PICK_STEP_LENGTH);
    let mut position = leaf_world.inverse_transform_point(ray.origin);

    for _ in 0..max_steps {
        let cell = local_cell(leaf, position);
        let inside = (0..dim).contains(&cell.x) && (0..dim).contains(&cell.y);
        if inside && position.y <= field.scaled_height(cell.x, cell.y) {
            let previous = position - step;
            return Some(MarchHit {
                local_position: previous,
                cell: local_cell(leaf, previous),
            });
        }
        position += step;
    }
    None
}

#[inline]
fn local_cell(leaf: &QuadNode, local: Vec3) -> IVec2 {
    IVec2::new(
        (local.x + leaf.rect.x as f32).floor() as i32,
        (local.z + leaf.rect.y as f32).floor() as i32,
    )
}

/// Full pick: broad phase, then march the nearest candidate only.
pub fn pick(
    index: &QuadIndex,
    field: &HeightField,
    world_transform: &TerrainTransform,
    ray: Ray3d,
    viewer_position: Vec3,
    max_steps: u32,
) -> PickResult {
    let candidates = collect_candidates(index, world_transform, ray);
    let Some(nearest) = candidates.first() else {
        return PickResult::miss();
    };

    let leaf_world = world_transform.child(nearest.leaf.translation);
    let Some(hit) = march_leaf(field, nearest.leaf, &leaf_world, ray, max_steps) else {
        trace!(
            "Pick missed: nearest of {} candidates exhausted {} steps",
            candidates.len(),
            max_steps
        );
        return PickResult::miss();
    };

    let world_position = leaf_world.transform_point(hit.local_position);
    let dim = field.dimension() as f32;
    let cell = hit.cell.clamp(IVec2::ZERO, IVec2::splat(field.dimension() as i32 - 1));
    PickResult {
        distance: Some(viewer_position.distance(world_position)),
        world_position,
        map_position: cell.as_vec2() / dim,
    }
}
