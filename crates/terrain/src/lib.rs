//! Height-field terrain core.
//!
//! A [`Terrain`] owns a square [`HeightField`] and a fixed [`QuadIndex`] built
//! over it. Each frame the index is walked against a view frustum to find the
//! visible leaf patches, and optionally against a pointer ray to find the
//! surface point under the cursor. Meshes, materials and input are left to the
//! host app; [`TerrainPlugin`] wires the per-frame work into `PostUpdate`.

pub mod config;
pub mod cull;
pub mod error;
pub mod height_field;
pub mod pick;
pub mod quad_index;
pub mod systems;
pub mod terrain;
pub mod transform;

pub use config::TerrainSettings;
pub use cull::LeafDraw;
pub use error::{SourceSize, TerrainError, TerrainResult};
pub use height_field::{HeightField, HeightSource};
pub use pick::PickResult;
pub use quad_index::{GridRect, QuadIndex, QuadNode, Quadrant};
pub use systems::{TerrainPickRay, TerrainPlugin, TerrainSystems, TerrainViewer, VisibleLeaves};
pub use terrain::{Terrain, TerrainMaterials};
pub use transform::TerrainTransform;
