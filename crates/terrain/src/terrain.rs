use bevy::math::Vec3A;
use bevy::prelude::*;
use bevy::render::primitives::{Frustum, Sphere};

use crate::config::TerrainSettings;
use crate::cull::{visit_visible, LeafDraw};
use crate::error::TerrainResult;
use crate::height_field::{HeightField, HeightSource};
use crate::pick::{pick, PickResult};
use crate::quad_index::QuadIndex;
use crate::systems::VisibleLeaves;
use crate::transform::TerrainTransform;

/// Texture handles the external renderer binds per visible leaf.
/// Opaque to the core and returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct TerrainMaterials {
    pub blend_map: Option<Handle<Image>>,
    pub layers: Vec<Handle<Image>>,
}

/// A height-field terrain: owns its height data, the quad-tree built over it,
/// a coarse bounding sphere, and the last pick result.
///
/// The owning entity's rotation is ignored; see [`TerrainTransform`].
#[derive(Component, Debug, Clone)]
#[require(Transform, VisibleLeaves)]
pub struct Terrain {
    field: HeightField,
    index: QuadIndex,
    /// Local-space bound around the actual sampled heights.
    bounding_sphere: Sphere,
    materials: TerrainMaterials,
    picking_enabled: bool,
    max_pick_steps: u32,
    last_pick: PickResult,
}

impl Terrain {
    /// Builds a flat terrain. Fails with `InvalidTopology` before anything is allocated
    /// for an unbuildable `(dimension, levels)` pair.
    pub fn new(settings: &TerrainSettings) -> TerrainResult<Self> {
        settings.validate()?;
        let index = QuadIndex::build(settings.dimension, settings.levels, settings.height_scale())?;
        let field = HeightField::new(settings.dimension, settings.normal_strength)?;
        info!(
            "Terrain {}x{}: {} levels, {} leaves of {}x{} cells, height scale {}",
            settings.dimension,
            settings.dimension,
            settings.levels,
            index.leaf_count(),
            index.leaf_dimension(),
            index.leaf_dimension(),
            index.height_scale()
        );
        let mut terrain = Self {
            bounding_sphere: Sphere {
                center: Vec3A::ZERO,
                radius: 0.0,
            },
            field,
            index,
            materials: TerrainMaterials::default(),
            picking_enabled: settings.picking_enabled,
            max_pick_steps: settings.max_pick_steps,
            last_pick: PickResult::miss(),
        };
        terrain.recompute_bounding_sphere();
        Ok(terrain)
    }

    /// Builds a terrain and loads `source` into it.
    pub fn from_source(settings: &TerrainSettings, source: HeightSource<'_>) -> TerrainResult<Self> {
        let mut terrain = Self::new(settings)?;
        terrain.set_height(source)?;
        Ok(terrain)
    }

    pub fn with_materials(mut self, materials: TerrainMaterials) -> Self {
        self.materials = materials;
        self
    }

    /// Replaces all heights, then rebuilds normals, packed samples and the
    /// bounding sphere. On error nothing changes.
    pub fn set_height(&mut self, source: HeightSource<'_>) -> TerrainResult<()> {
        if let Err(err) = self.field.set_height(source) {
            warn!("Rejected terrain height source: {err}");
            return Err(err);
        }
        self.recompute_bounding_sphere();
        Ok(())
    }

    #[inline]
    pub fn get_height(&self, x: i32, y: i32) -> f32 {
        self.field.get_height(x, y)
    }

    fn recompute_bounding_sphere(&mut self) {
        let (lo, hi) = self.field.height_range();
        let scale = self.field.height_scale();
        let half = self.field.dimension() as f32 * 0.5;
        let half_height = (hi - lo) * scale * 0.5;
        self.bounding_sphere = Sphere {
            center: Vec3A::new(half, (lo + hi) * scale * 0.5, half),
            radius: Vec3::new(half, half_height, half).length(),
        };
    }

    pub fn bounding_sphere(&self) -> Sphere {
        self.bounding_sphere.clone()
    }

    /// Bounding sphere in world space. Uses the largest scale axis, so the
    /// result stays conservative under non-uniform scale.
    pub fn world_bounding_sphere(&self, transform: &TerrainTransform) -> Sphere {
        let center = transform.transform_point(self.bounding_sphere.center.into());
        Sphere {
            center: center.into(),
            radius: self.bounding_sphere.radius * transform.scale.abs().max_element(),
        }
    }

    /// Calls `visit` once per leaf whose box intersects `frustum`.
    pub fn visit_visible(
        &self,
        transform: &TerrainTransform,
        frustum: &Frustum,
        mut visit: impl FnMut(LeafDraw),
    ) {
        visit_visible(self.index.root(), transform, frustum, &mut |leaf, leaf_world| {
            visit(LeafDraw::new(&self.index, leaf, leaf_world));
        });
    }

    /// Intersects a world-space ray with the surface. `viewer_position` only
    /// feeds the reported distance.
    pub fn pick(&self, transform: &TerrainTransform, ray: Ray3d, viewer_position: Vec3) -> PickResult {
        pick(
            &self.index,
            &self.field,
            transform,
            ray,
            viewer_position,
            self.max_pick_steps,
        )
    }

    #[inline]
    pub fn height_field(&self) -> &HeightField {
        &self.field
    }

    #[inline]
    pub fn index(&self) -> &QuadIndex {
        &self.index
    }

    #[inline]
    pub fn dimension(&self) -> u32 {
        self.field.dimension()
    }

    #[inline]
    pub fn levels(&self) -> u32 {
        self.index.levels()
    }

    #[inline]
    pub fn leaf_dimension(&self) -> u32 {
        self.index.leaf_dimension()
    }

    #[inline]
    pub fn height_scale(&self) -> f32 {
        self.field.height_scale()
    }

    pub fn materials(&self) -> &TerrainMaterials {
        &self.materials
    }

    pub fn set_materials(&mut self, materials: TerrainMaterials) {
        self.materials = materials;
    }

    pub fn picking_enabled(&self) -> bool {
        self.picking_enabled
    }

    /// Disabling picking also clears the stored result.
    pub fn set_picking_enabled(&mut self, enabled: bool) {
        self.picking_enabled = enabled;
        if !enabled {
            self.last_pick = PickResult::miss();
        }
    }

    pub fn max_pick_steps(&self) -> u32 {
        self.max_pick_steps
    }

    pub fn last_pick(&self) -> PickResult {
        self.last_pick
    }

    /// Replaces the stored pick; previous results are never merged.
    pub fn set_last_pick(&mut self, result: PickResult) {
        self.last_pick = result;
    }
}
