use fastnoise_lite::{FastNoiseLite, NoiseType};

/// Fraction of the terrain's height scale the generated relief spans.
/// The height scale is four times the grid width, so full-range noise is all cliffs.
const RELIEF: f32 = 0.06;

/// Noise features per grid side, independent of resolution.
const FEATURES_PER_SIDE: f32 = 3.0;

/// Row-major normalized heights for a `dimension x dimension` grid.
pub fn generate_heights(dimension: u32, seed: i32) -> Vec<f32> {
    let mut noise = FastNoiseLite::with_seed(seed);
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_frequency(Some(FEATURES_PER_SIDE / dimension as f32));

    let mut heights = Vec::with_capacity((dimension * dimension) as usize);
    for y in 0..dimension {
        for x in 0..dimension {
            let raw = noise.get_noise_2d(x as f32, y as f32);
            let elevation = ((raw + 1.0) * 0.5).clamp(0.0, 1.0);
            heights.push(elevation * RELIEF);
        }
    }
    heights
}
