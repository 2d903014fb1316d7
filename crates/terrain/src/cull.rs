use bevy::prelude::*;
use bevy::render::primitives::Frustum;

use crate::quad_index::{GridRect, QuadIndex, QuadNode, Quadrant};
use crate::transform::TerrainTransform;

/// Everything an external renderer needs to draw one visible leaf patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafDraw {
    pub rect: GridRect,
    pub level: u32,
    pub quadrant: Option<Quadrant>,
    /// Places the patch's local origin (cell `(rect.x, rect.y)`) in the world.
    pub world_transform: TerrainTransform,
    /// Offset of the patch into the sample texture, in `[0, 1]` UV units.
    pub sample_offset: Vec2,
    /// `leaf_dimension / dimension`.
    pub sample_scale: f32,
}

impl LeafDraw {
    pub fn new(index: &QuadIndex, leaf: &QuadNode, world_transform: TerrainTransform) -> Self {
        let dim = index.dimension() as f32;
        Self {
            rect: leaf.rect,
            level: leaf.level,
            quadrant: leaf.quadrant,
            world_transform,
            sample_offset: Vec2::new(leaf.rect.x as f32, leaf.rect.y as f32) / dim,
            sample_scale: index.leaf_dimension() as f32 / dim,
        }
    }
}

/// Recursive frustum traversal.
///
/// Each node tests its own box; a culled node prunes only its own subtree,
/// while a visible internal node recurses into all four children.
/// `world_transform` is the terrain's transform; node placement is applied here.
pub fn visit_visible<'a, F>(
    node: &'a QuadNode,
    world_transform: &TerrainTransform,
    frustum: &Frustum,
    visit: &mut F,
) where
    F: FnMut(&'a QuadNode, TerrainTransform),
{
    let node_world = world_transform.child(node.translation);
    if !frustum.intersects_obb(&node.bounds, &node_world.to_affine(), true, true) {
        return;
    }
    match &node.children {
        Some(children) => {
            for child in children.iter() {
                visit_visible(child, world_transform, frustum, visit);
            }
        }
        None => visit(node, node_world),
    }
}


#[cfg(test)]
mod tests {
    use super::test_frustum::box_frustum;
    use super::*;
    use std::collections::HashSet;

    fn visible_rects(index: &QuadIndex, world: &TerrainTransform, frustum: &Frustum) -> Vec<GridRect> {
        let mut rects = Vec::new();
        visit_visible(index.root(), world, frustum, &mut |leaf, _| rects.push(leaf.rect));
        rects
    }

    #[test]
    fn test_enclosing_frustum_visits_every_leaf_once() {
        let index = QuadIndex::build(16, 2, 64.0).unwrap();
        let frustum = box_frustum(Vec3::splat(-10.0), Vec3::splat(100.0));
        let rects = visible_rects(&index, &TerrainTransform::IDENTITY, &frustum);
        assert_eq!(rects.len(), 16);
        let unique: HashSet<_> = rects.iter().collect();
        assert_eq!(unique.len(), 16);
    }

    #[test]
    fn test_disjoint_frustum_visits_nothing() {
        let index = QuadIndex::build(16, 2, 64.0).unwrap();
        let frustum = box_frustum(Vec3::new(100.0, 0.0, 100.0), Vec3::new(200.0, 50.0, 200.0));
        assert!(visible_rects(&index, &TerrainTransform::IDENTITY, &frustum).is_empty());
    }

    #[test]
    fn test_partial_frustum_prunes_siblings() {
        let index = QuadIndex::build(16, 2, 64.0).unwrap();
        // Covers only cells x in [0, 3.5], z in [0, 3.5]: the NW-most leaf.
        let frustum = box_frustum(Vec3::new(0.5, 0.0, 0.5), Vec3::new(3.5, 10.0, 3.5));
        let rects = visible_rects(&index, &TerrainTransform::IDENTITY, &frustum);
        assert_eq!(rects, vec![GridRect::new(0, 0, 4, 4)]);
    }

    #[test]
    fn test_world_transform_moves_visibility() {
        let index = QuadIndex::build(16, 2, 64.0).unwrap();
        let world = TerrainTransform::from_translation(Vec3::new(100.0, 0.0, 0.0));
        let frustum = box_frustum(Vec3::new(112.5, 0.0, 0.5), Vec3::new(115.5, 10.0, 3.5));
        let rects = visible_rects(&index, &world, &frustum);
        assert_eq!(rects, vec![GridRect::new(12, 0, 4, 4)]);
    }

    #[test]
    fn test_leaf_draw_sample_offset_and_scale() {
        let index = QuadIndex::build(16, 2, 64.0).unwrap();
        let leaf = index.leaf_at(9, 13).unwrap();
        let draw = LeafDraw::new(&index, leaf, TerrainTransform::IDENTITY.child(leaf.translation));
        assert_eq!(draw.rect, GridRect::new(8, 12, 4, 4));
        assert_eq!(draw.sample_offset, Vec2::new(0.5, 0.75));
        assert_eq!(draw.sample_scale, 0.25);
        assert_eq!(draw.world_transform.translation, Vec3::new(8.0, 0.0, 12.0));
    }
}
