//! Fixed quad-tree over the terrain grid.
//!
//! Grid convention: cell `(0, 0)` sits at the local origin, cell `x` grows along
//! +X and cell `y` (row) grows along +Z. "North" is -Z, so the NW child of a
//! rectangle `(x, y, w, h)` is `(x, y, w/2, h/2)` and SE is
//! `(x + w/2, y + h/2, w/2, h/2)`.
//!
//! Node boxes are conservative: they span the node's footprint horizontally and
//! `[0, height_scale]` vertically, so height edits never invalidate the tree.

use bevy::prelude::*;
use bevy::render::primitives::Aabb;

use crate::config::validate_topology;
use crate::error::TerrainResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthWest,
        Quadrant::SouthEast,
    ];
}

/// Rectangle in grid-cell units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl GridRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub fn contains(&self, cx: u32, cy: u32) -> bool {
        cx >= self.x && cx < self.x + self.width && cy >= self.y && cy < self.y + self.height
    }

    /// The sub-rectangle covering `quadrant`.
    pub fn quadrant(&self, quadrant: Quadrant) -> GridRect {
        let hw = self.width / 2;
        let hh = self.height / 2;
        match quadrant {
            Quadrant::NorthWest => GridRect::new(self.x, self.y, hw, hh),
            Quadrant::NorthEast => GridRect::new(self.x + hw, self.y, hw, hh),
            Quadrant::SouthWest => GridRect::new(self.x, self.y + hh, hw, hh),
            Quadrant::SouthEast => GridRect::new(self.x + hw, self.y + hh, hw, hh),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuadNode {
    pub level: u32,
    /// `None` for the root.
    pub quadrant: Option<Quadrant>,
    pub rect: GridRect,
    /// Box in the node's own frame (relative to `translation`).
    pub bounds: Aabb,
    /// Places the node's patch within the terrain grid: `(rect.x, 0, rect.y)`.
    pub translation: Vec3,
    pub children: Option<Box<[QuadNode; 4]>>,
}

impl QuadNode {
    fn build(
        level: u32,
        levels: u32,
        quadrant: Option<Quadrant>,
        rect: GridRect,
        height_scale: f32,
    ) -> Self {
        let bounds = Aabb::from_min_max(
            Vec3::ZERO,
            Vec3::new(rect.width as f32, height_scale, rect.height as f32),
        );
        let children = (level < levels).then(|| {
            Box::new(Quadrant::ALL.map(|q| {
                QuadNode::build(level + 1, levels, Some(q), rect.quadrant(q), height_scale)
            }))
        });
        Self {
            level,
            quadrant,
            rect,
            bounds,
            translation: Vec3::new(rect.x as f32, 0.0, rect.y as f32),
            children,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn children(&self) -> &[QuadNode] {
        match &self.children {
            Some(children) => children.as_slice(),
            None => &[],
        }
    }

    /// Visits every leaf below (or at) this node, NW to SE.
    pub fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(&'a QuadNode)) {
        match &self.children {
            Some(children) => children.iter().for_each(|c| c.for_each_leaf(f)),
            None => f(self),
        }
    }
}

/// Quad-tree built once from `(dimension, levels)`; immutable afterwards.
#[derive(Debug, Clone)]
pub struct QuadIndex {
    dimension: u32,
    levels: u32,
    leaf_dimension: u32,
    height_scale: f32,
    root: QuadNode,
}

impl QuadIndex {
    /// Builds the full tree. Fails with `InvalidTopology` when `dimension` is not a
    /// power of two or `dimension >> levels` is below one cell.
    pub fn build(dimension: u32, levels: u32, height_scale: f32) -> TerrainResult<Self> {
        let leaf_dimension = validate_topology(dimension, levels)?;
        let root = QuadNode::build(
            0,
            levels,
            None,
            GridRect::new(0, 0, dimension, dimension),
            height_scale,
        );
        Ok(Self {
            dimension,
            levels,
            leaf_dimension,
            height_scale,
            root,
        })
    }

    #[inline]
    pub fn root(&self) -> &QuadNode {
        &self.root
    }

    #[inline]
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    #[inline]
    pub fn levels(&self) -> u32 {
        self.levels
    }

    #[inline]
    pub fn leaf_dimension(&self) -> u32 {
        self.leaf_dimension
    }

    #[inline]
    pub fn height_scale(&self) -> f32 {
        self.height_scale
    }

    pub fn leaf_count(&self) -> usize {
        1usize << (2 * self.levels)
    }

    pub fn node_count(&self) -> usize {
        (0..=self.levels).map(|l| 1usize << (2 * l)).sum()
    }

    pub fn leaves(&self) -> Vec<&QuadNode> {
        let mut leaves = Vec::with_capacity(self.leaf_count());
        self.root.for_each_leaf(&mut |leaf| leaves.push(leaf));
        leaves
    }

    /// The leaf whose footprint contains cell `(cx, cy)`.
    pub fn leaf_at(&self, cx: u32, cy: u32) -> Option<&QuadNode> {
        let mut node = &self.root;
        if !node.rect.contains(cx, cy) {
            return None;
        }
        while let Some(children) = &node.children {
            node = children.iter().find(|c| c.rect.contains(cx, cy))?;
        }
        Some(node)
    }
}
