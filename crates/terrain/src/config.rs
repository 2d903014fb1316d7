use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};

/// World-space vertical scale per grid cell. `height_scale = HEIGHT_SCALE_PER_CELL * dimension`.
pub const HEIGHT_SCALE_PER_CELL: f32 = 4.0;

/// Multiplier applied to height differences when deriving shading normals.
/// Only affects perceived steepness in the normal field, never the geometry.
pub const DEFAULT_NORMAL_STRENGTH: f32 = 0.25;

/// Hard cap on ray-march iterations for a single pick candidate.
pub const MAX_PICK_STEPS: u32 = 5000;

/// Length of one ray-march step in world units.
pub const PICK_STEP_LENGTH: f32 = 1.0;

pub const DEFAULT_DIMENSION: u32 = 256;
pub const DEFAULT_LEVELS: u32 = 3;

/// Vertical scale derived from the grid dimension.
#[inline]
pub fn height_scale_for(dimension: u32) -> f32 {
    HEIGHT_SCALE_PER_CELL * dimension as f32
}

/// Construction parameters for a [`crate::terrain::Terrain`].
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Cells per grid side. Must be a power of two.
    pub dimension: u32,
    /// Quad-tree depth. Leaves are `dimension >> levels` cells wide.
    pub levels: u32,
    pub normal_strength: f32,
    pub picking_enabled: bool,
    /// March steps allowed per pick, each [`PICK_STEP_LENGTH`] world units
    /// from the ray origin. A ray reaches at most
    /// `max_pick_steps * PICK_STEP_LENGTH` units, so with the default cap a
    /// ray that starts `2 * height_scale` high misses a mid-height surface
    /// once `dimension >= 1024`. Raise the cap for such terrains.
    pub max_pick_steps: u32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            levels: DEFAULT_LEVELS,
            normal_strength: DEFAULT_NORMAL_STRENGTH,
            picking_enabled: true,
            max_pick_steps: MAX_PICK_STEPS,
        }
    }
}

impl TerrainSettings {
    pub fn new(dimension: u32, levels: u32) -> Self {
        Self {
            dimension,
            levels,
            ..Default::default()
        }
    }

    pub fn height_scale(&self) -> f32 {
        height_scale_for(self.dimension)
    }

    /// Checks that `dimension` and `levels` describe a buildable quad-tree.
    pub fn validate(&self) -> TerrainResult<()> {
        validate_topology(self.dimension, self.levels).map(|_| ())
    }
}

/// Returns the leaf dimension for a valid `(dimension, levels)` pair.
pub fn validate_topology(dimension: u32, levels: u32) -> TerrainResult<u32> {
    if !dimension.is_power_of_two() {
        return Err(TerrainError::InvalidTopology {
            dimension,
            levels,
            reason: "dimension must be a power of two",
        });
    }
    if levels >= u32::BITS || dimension >> levels == 0 {
        return Err(TerrainError::InvalidTopology {
            dimension,
            levels,
            reason: "levels leaves no whole cell per leaf",
        });
    }
    Ok(dimension >> levels)
}
