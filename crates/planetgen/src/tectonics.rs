//! Plate field synthesis: a weighted Voronoi partition of the grid into
//! uplifted and subsided plates, with extra relief along plate boundaries.

use crate::config::{FaultType, PlanetGenConfig, PlateConfig};
use crate::constants::*;
use crate::grid::Grid;
use crate::plate::{PlateSeed, PlateType};
use crate::tools::{hash_index, stage_rng, stage_seed};
use log::debug;
use noise::{NoiseFn, Perlin};
use rand::Rng;
use std::f64::consts::TAU;

/// Builds the raw height field for the configured plates. Values are in `[0, 1]`.
pub fn synthesize_plate_field(config: &PlanetGenConfig) -> Grid {
    let size = config.generation.resolution;
    let seeds = generate_seeds(size, &config.plates, config.generation.seed);
    let warp = BoundaryWarp::new(config.generation.seed, config.plates.jitter, size);
    let plate_delta = config.plates.plate_delta;

    debug!(
        "Synthesizing plate field: {} plates ({} continental) on {size}x{size}",
        seeds.len(),
        seeds.iter().filter(|s| s.plate_type == PlateType::Continental).count()
    );

    Grid::from_fn(size, |x, y| {
        let (px, py) = warp.apply(x as f32, y as f32);
        plate_height(px, py, &seeds, size as f32, plate_delta)
    })
}

/// Scatters the plate seeds.
///
/// Every seed gets a random elevation sign, a size bias drawn from
/// `1 ± plate_size_variance`, and, when desymmetrizing, a per-row skew.
/// With two or more plates both plate types are always present.
pub fn generate_seeds(size: usize, plates: &PlateConfig, seed: u64) -> Vec<PlateSeed> {
    let mut rng = stage_rng(seed, PLATE_SALT);
    let fault_seed = stage_seed(seed, PLATE_SALT ^ 0xFA17);
    let size_f = size as f32;
    let variance = plates.plate_size_variance;

    let mut seeds: Vec<PlateSeed> = (0..plates.plate_count)
        .map(|i| {
            let x = rng.random_range(0.0..size_f);
            let y = rng.random_range(0.0..size_f);
            let plate_type = if rng.random_bool(0.5) {
                PlateType::Continental
            } else {
                PlateType::Oceanic
            };
            let magnitude = plates.plate_delta * rng.random_range(0.6..=1.0);
            let size_bias = (1.0 + rng.random_range(-variance..=variance)).max(MIN_SIZE_BIAS);
            let skew = if plates.desymmetrize_tiling {
                rng.random_range(-MAX_SKEW..=MAX_SKEW)
            } else {
                0.0
            };
            PlateSeed {
                x,
                y,
                elevation_bias: magnitude * plate_type.sign(),
                plate_type,
                size_bias,
                skew,
                fault: resolve_fault(plates.fault_type, i, fault_seed),
            }
        })
        .collect();

    if seeds.len() >= 2 && seeds.iter().all(|s| s.plate_type == seeds[0].plate_type) {
        if let Some(last) = seeds.last_mut() {
            last.plate_type = match last.plate_type {
                PlateType::Continental => PlateType::Oceanic,
                PlateType::Oceanic => PlateType::Continental,
            };
            last.elevation_bias = -last.elevation_bias;
        }
    }

    seeds
}

fn resolve_fault(fault_type: FaultType, index: usize, seed: u64) -> FaultType {
    match fault_type {
        FaultType::Mixed => match hash_index(index, seed) % 3 {
            0 => FaultType::Ridge,
            1 => FaultType::Trench,
            _ => FaultType::Shear,
        },
        other => other,
    }
}

/// Height of a single point given the seeds.
///
/// The nearest seed sets the base elevation. The ratio of the nearest to
/// the second-nearest weighted distance is ~1 on a boundary and ~0 deep
/// inside a plate; raised to `BOUNDARY_SHARPNESS` it drives the fault term.
pub fn plate_height(px: f32, py: f32, seeds: &[PlateSeed], size: f32, plate_delta: f32) -> f32 {
    let mut nearest = None;
    let mut d1 = f32::INFINITY;
    let mut d2 = f32::INFINITY;

    for seed in seeds {
        let dx = wrapped_delta(px - seed.x_at_row(py), size);
        let dy = py - seed.y;
        let d = (dx * dx + dy * dy).sqrt() / seed.size_bias;
        if d < d1 {
            d2 = d1;
            d1 = d;
            nearest = Some(seed);
        } else if d < d2 {
            d2 = d;
        }
    }

    let Some(plate) = nearest else {
        return 0.5;
    };

    let ratio = if d2.is_finite() && d2 > 0.0 { d1 / d2 } else { 0.0 };
    let proximity = ratio.powf(BOUNDARY_SHARPNESS);
    let boundary = proximity * plate.fault_term() * plate_delta * BOUNDARY_GAIN;

    let height = 0.5 + plate.elevation_bias + boundary;
    if height.is_finite() { height.clamp(0.0, 1.0) } else { 0.5 }
}

/// Shortest signed distance on the wrapped x axis.
#[inline]
fn wrapped_delta(d: f32, size: f32) -> f32 {
    let d = d.rem_euclid(size);
    if d > size * 0.5 { d - size } else { d }
}

/// Perlin domain warp, sampled on a cylinder so it is seamless across the
/// wrapped x axis.
struct BoundaryWarp {
    x_noise: Perlin,
    y_noise: Perlin,
    amplitude: f32,
    size: f32,
}

impl BoundaryWarp {
    fn new(seed: u64, jitter: f32, size: usize) -> Self {
        let noise_seed = stage_seed(seed, WARP_SALT) as u32;
        Self {
            x_noise: Perlin::new(noise_seed),
            y_noise: Perlin::new(noise_seed.wrapping_add(1)),
            amplitude: jitter * WARP_FRACTION * size as f32,
            size: size as f32,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        if self.amplitude <= 0.0 {
            return (x, y);
        }
        let angle = x as f64 / self.size as f64 * TAU;
        let p = [
            angle.cos() * WARP_FREQUENCY,
            angle.sin() * WARP_FREQUENCY,
            y as f64 / self.size as f64 * TAU * WARP_FREQUENCY,
        ];
        let dx = self.x_noise.get(p) as f32 * self.amplitude;
        let dy = self.y_noise.get(p) as f32 * self.amplitude;
        (x + dx, y + dy)
    }
}
