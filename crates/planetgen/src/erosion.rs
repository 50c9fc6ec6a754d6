//! Particle-based hydraulic erosion.
//!
//! Each trial drops one droplet at a random point. The droplet follows the
//! local gradient, eroding where it can carry more sediment and depositing
//! where it carries too much or has to climb.

use crate::config::ErosionConfig;
use crate::constants::*;
use crate::grid::Grid;
use crate::tools::stage_rng;
use glam::Vec2;
use log::debug;
use rand::Rng;

struct Droplet {
    position: Vec2,
    direction: Vec2,
    speed: f32,
    water: f32,
    sediment: f32,
}

impl Droplet {
    fn spawn(position: Vec2) -> Self {
        Self {
            position,
            direction: Vec2::ZERO,
            speed: DROPLET_INITIAL_SPEED,
            water: DROPLET_INITIAL_WATER,
            sediment: 0.0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ErosionStats {
    pub droplets: usize,
    pub steps: usize,
    /// Droplets stopped because the gradient or height went non-finite.
    pub degenerate: usize,
    pub eroded: f32,
    pub deposited: f32,
}

/// Runs `config.iterations` droplets over `field` in place.
pub fn erode(field: &mut Grid, config: &ErosionConfig, seed: u64) -> ErosionStats {
    let mut rng = stage_rng(seed, EROSION_SALT);
    let size = field.size() as f32;
    let mut stats = ErosionStats::default();

    for _ in 0..config.iterations {
        let start = Vec2::new(rng.random_range(0.0..size), rng.random_range(0.0..size - 1.0));
        simulate_droplet(field, config, Droplet::spawn(start), &mut stats);
        stats.droplets += 1;
    }

    debug!(
        "Erosion: {} droplets, {} steps, {} degenerate, eroded {:.3}, deposited {:.3}",
        stats.droplets, stats.steps, stats.degenerate, stats.eroded, stats.deposited
    );
    stats
}

fn simulate_droplet(field: &mut Grid, config: &ErosionConfig, mut drop: Droplet, stats: &mut ErosionStats) {
    let size = field.size() as f32;

    for _ in 0..DROPLET_STEP_BUDGET {
        stats.steps += 1;
        let (height, gradient) = height_and_gradient(field, drop.position);
        if !height.is_finite() || !gradient.is_finite() {
            stats.degenerate += 1;
            return;
        }

        drop.direction = drop.direction * config.inertia - gradient * (1.0 - config.inertia);
        let Some(direction) = drop.direction.try_normalize() else {
            // flat spot with no momentum left
            return;
        };
        drop.direction = direction;

        let old_position = drop.position;
        drop.position += direction;
        if drop.position.y < 0.0 || drop.position.y > size - 1.0 {
            return;
        }
        drop.position.x = drop.position.x.rem_euclid(size);

        let (new_height, _) = height_and_gradient(field, drop.position);
        let delta_height = new_height - height;
        if !delta_height.is_finite() {
            stats.degenerate += 1;
            return;
        }

        let capacity = (-delta_height).max(MIN_SEDIMENT_CAPACITY_SLOPE)
            * drop.speed
            * drop.water
            * SEDIMENT_CAPACITY_FACTOR;

        if drop.sediment > capacity || delta_height > 0.0 {
            // uphill: fill the pit behind us, but no more than we carry
            let excess = if delta_height > 0.0 {
                delta_height.min(drop.sediment)
            } else {
                drop.sediment - capacity
            };
            let amount = excess * config.deposition_rate;
            drop.sediment -= amount;
            stats.deposited += amount;
            distribute(field, old_position, amount);
        } else {
            let amount = ((capacity - drop.sediment) * config.erosion_rate).min(-delta_height);
            drop.sediment += amount;
            stats.eroded += amount;
            distribute(field, old_position, -amount);
        }

        drop.speed = (drop.speed * drop.speed - delta_height * config.gravity).max(0.0).sqrt();
        drop.water *= 1.0 - config.evaporation_rate;

        if drop.speed < MIN_DROPLET_SPEED || drop.water < MIN_DROPLET_WATER {
            return;
        }
    }
}

/// Bilinear height and gradient from the four grid nodes around `p`.
fn height_and_gradient(field: &Grid, p: Vec2) -> (f32, Vec2) {
    let x0 = p.x.floor();
    let y0 = p.y.floor();
    let u = p.x - x0;
    let v = p.y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let nw = field.get_wrapped(x0, y0);
    let ne = field.get_wrapped(x0 + 1, y0);
    let sw = field.get_wrapped(x0, y0 + 1);
    let se = field.get_wrapped(x0 + 1, y0 + 1);

    let gradient = Vec2::new((ne - nw) * (1.0 - v) + (se - sw) * v, (sw - nw) * (1.0 - u) + (se - ne) * u);
    let height = nw * (1.0 - u) * (1.0 - v) + ne * u * (1.0 - v) + sw * (1.0 - u) * v + se * u * v;
    (height, gradient)
}

/// Adds `amount` to the four nodes around `p`, weighted bilinearly.
fn distribute(field: &mut Grid, p: Vec2, amount: f32) {
    let size = field.size() as i64;
    let x0 = p.x.floor();
    let y0 = p.y.floor();
    let u = p.x - x0;
    let v = p.y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    for (dx, dy, w) in [
        (0, 0, (1.0 - u) * (1.0 - v)),
        (1, 0, u * (1.0 - v)),
        (0, 1, (1.0 - u) * v),
        (1, 1, u * v),
    ] {
        let y = y0 + dy;
        if y < 0 || y >= size {
            continue;
        }
        let x = (x0 + dx).rem_euclid(size) as usize;
        let y = y as usize;
        let current = field.get(x, y);
        field.set(x, y, current + amount * w);
    }
}
