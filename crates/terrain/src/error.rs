// ---------------------------------------------------------------------------
// TerrainError: construction and height-edit failures
// ---------------------------------------------------------------------------

use std::fmt;

/// Shape of a height source that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSize {
    Samples(usize),
    Image { width: u32, height: u32 },
}

impl fmt::Display for SourceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSize::Samples(len) => write!(f, "{len} samples"),
            SourceSize::Image { width, height } => write!(f, "{width}x{height} image"),
        }
    }
}

/// Errors reported by terrain construction and height edits.
///
/// A pick that finds no surface is not an error; see
/// [`crate::pick::PickResult::miss`].
#[derive(Debug)]
pub enum TerrainError {
    /// The quad-tree cannot be built for this `(dimension, levels)` pair.
    /// Fatal to construction.
    InvalidTopology {
        dimension: u32,
        levels: u32,
        reason: &'static str,
    },
    /// A height source does not cover exactly `dimension x dimension` cells.
    /// The previous height data is left untouched.
    InvalidDimensions { dimension: u32, found: SourceSize },
    /// An image source uses a texel format that cannot be read back as color.
    UnreadableImage(String),
}

impl fmt::Display for TerrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerrainError::InvalidTopology {
                dimension,
                levels,
                reason,
            } => write!(
                f,
                "Invalid topology: dimension {dimension} with {levels} levels ({reason})"
            ),
            TerrainError::InvalidDimensions { dimension, found } => write!(
                f,
                "Invalid dimensions: expected {dimension}x{dimension} cells, got {found}"
            ),
            TerrainError::UnreadableImage(msg) => write!(f, "Unreadable height image: {msg}"),
        }
    }
}

impl std::error::Error for TerrainError {}

pub type TerrainResult<T> = Result<T, TerrainError>;
