//! Per-cell height and derived normal storage for a square terrain grid.
//!
//! Heights are normalized to `[0, 1]`; world height is `height * height_scale`.
//! Normals and the packed sample buffer are derived data and are rebuilt
//! synchronously by every successful [`HeightField::set_height`].

use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use crate::config::height_scale_for;
use crate::error::{SourceSize, TerrainError, TerrainResult};

/// Input accepted by [`HeightField::set_height`].
#[derive(Clone, Copy)]
pub enum HeightSource<'a> {
    /// Square color image; each texel's RGB channels are averaged.
    Image(&'a Image),
    /// Row-major normalized heights, `samples[y * dimension + x]`. Values are
    /// clamped into `[0, 1]` and NaN reads as `0`.
    Samples(&'a [f32]),
}

/// Square grid of normalized heights plus derived shading normals.
#[derive(Debug, Clone)]
pub struct HeightField {
    dimension: u32,
    height_scale: f32,
    normal_strength: f32,
    heights: Vec<f32>,
    normals: Vec<Vec3>,
    /// `[normal.x, normal.y, normal.z, height]` per cell, laid out like `heights`.
    samples: Vec<[f32; 4]>,
}

impl HeightField {
    /// Creates a flat field (all heights zero). `dimension` must be a power of two.
    pub fn new(dimension: u32, normal_strength: f32) -> TerrainResult<Self> {
        if !dimension.is_power_of_two() {
            return Err(TerrainError::InvalidTopology {
                dimension,
                levels: 0,
                reason: "dimension must be a power of two",
            });
        }
        let cells = (dimension as usize) * (dimension as usize);
        let mut field = Self {
            dimension,
            height_scale: height_scale_for(dimension),
            normal_strength,
            heights: vec![0.0; cells],
            normals: vec![Vec3::Y; cells],
            samples: vec![[0.0, 1.0, 0.0, 0.0]; cells],
        };
        field.rebuild_derived();
        Ok(field)
    }

    #[inline]
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    #[inline]
    pub fn height_scale(&self) -> f32 {
        self.height_scale
    }

    #[inline]
    pub fn normal_strength(&self) -> f32 {
        self.normal_strength
    }

    #[inline]
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    #[inline]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Packed per-cell samples consumed by the renderer.
    #[inline]
    pub fn samples(&self) -> &[[f32; 4]] {
        &self.samples
    }

    #[inline]
    fn clamped_index(&self, x: i32, y: i32) -> usize {
        let max = self.dimension as i32 - 1;
        let cx = x.clamp(0, max) as usize;
        let cy = y.clamp(0, max) as usize;
        cy * self.dimension as usize + cx
    }

    /// Normalized height at `(x, y)`. Out-of-range coordinates clamp to the edge.
    #[inline]
    pub fn get_height(&self, x: i32, y: i32) -> f32 {
        self.heights[self.clamped_index(x, y)]
    }

    /// Height at `(x, y)` in local vertical units (`height * height_scale`).
    #[inline]
    pub fn scaled_height(&self, x: i32, y: i32) -> f32 {
        self.get_height(x, y) * self.height_scale
    }

    /// Shading normal at `(x, y)`, clamped like [`Self::get_height`].
    #[inline]
    pub fn get_normal(&self, x: i32, y: i32) -> Vec3 {
        self.normals[self.clamped_index(x, y)]
    }

    /// Lowest and highest normalized heights currently stored.
    pub fn height_range(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }

    /// Replaces every height and rebuilds normals and packed samples.
    ///
    /// Fails with [`TerrainError::InvalidDimensions`] when the source does not
    /// cover exactly `dimension x dimension` cells; the field is unchanged then.
    pub fn set_height(&mut self, source: HeightSource<'_>) -> TerrainResult<()> {
        let heights = match source {
            HeightSource::Samples(samples) => self.read_samples(samples)?,
            HeightSource::Image(image) => self.read_image(image)?,
        };
        self.heights = heights;
        self.rebuild_derived();
        debug!(
            "Height field {}x{} updated from {}",
            self.dimension,
            self.dimension,
            match source {
                HeightSource::Samples(_) => "samples",
                HeightSource::Image(_) => "image",
            }
        );
        Ok(())
    }

    fn read_samples(&self, samples: &[f32]) -> TerrainResult<Vec<f32>> {
        if samples.len() != self.heights.len() {
            return Err(TerrainError::InvalidDimensions {
                dimension: self.dimension,
                found: SourceSize::Samples(samples.len()),
            });
        }
        Ok(samples.iter().copied().map(normalized).collect())
    }

    fn read_image(&self, image: &Image) -> TerrainResult<Vec<f32>> {
        let (width, height) = (image.width(), image.height());
        if width != self.dimension || height != self.dimension {
            return Err(TerrainError::InvalidDimensions {
                dimension: self.dimension,
                found: SourceSize::Image { width, height },
            });
        }
        let mut heights = Vec::with_capacity(self.heights.len());
        for y in 0..height {
            for x in 0..width {
                let color = image
                    .get_color_at(x, y)
                    .map_err(|e| TerrainError::UnreadableImage(e.to_string()))?;
                heights.push(channel_average(color));
            }
        }
        Ok(heights)
    }

    fn rebuild_derived(&mut self) {
        let dim = self.dimension as i32;
        let slope_scale = self.height_scale * self.normal_strength;
        for y in 0..dim {
            for x in 0..dim {
                let left = self.get_height(x - 1, y);
                let right = self.get_height(x + 1, y);
                let top = self.get_height(x, y - 1);
                let bottom = self.get_height(x, y + 1);

                let tangent_x = Vec3::new(2.0, (right - left) * slope_scale, 0.0);
                let tangent_z = Vec3::new(0.0, (bottom - top) * slope_scale, 2.0);
                let normal = tangent_z.cross(tangent_x).normalize_or_zero();
                let normal = if normal == Vec3::ZERO { Vec3::Y } else { normal };

                let idx = (y * dim + x) as usize;
                self.normals[idx] = normal;
                self.samples[idx] = [normal.x, normal.y, normal.z, self.heights[idx]];
            }
        }
    }

    /// Wraps the packed samples in an `Rgba32Float` image for GPU upload.
    pub fn to_sample_image(&self) -> Image {
        let data: Vec<u8> = self
            .samples
            .iter()
            .flat_map(|texel| texel.iter().flat_map(|c| c.to_ne_bytes()))
            .collect();
        Image::new(
            Extent3d {
                width: self.dimension,
                height: self.dimension,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            data,
            TextureFormat::Rgba32Float,
            RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
        )
    }
}

/// Clamps a source height into `[0, 1]`. NaN reads as ground level.
///
/// Node boxes span `[0, height_scale]`, so a stored height outside that
/// range would put visible geometry outside every box.
#[inline]
fn normalized(h: f32) -> f32 {
    if h.is_nan() {
        0.0
    } else {
        h.clamp(0.0, 1.0)
    }
}

/// Average of the stored RGB channels, clamped into `[0, 1]`.
fn channel_average(color: Color) -> f32 {
    let (r, g, b) = match color {
        Color::Srgba(c) => (c.red, c.green, c.blue),
        other => {
            let c = other.to_linear();
            (c.red, c.green, c.blue)
        }
    };
    normalized((r + g + b) / 3.0)
}
