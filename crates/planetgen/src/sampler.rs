use crate::grid::Grid;
use glam::Vec3;

/// Triplanar blend weights: `|x| + |y| + |z| = 1`.
pub fn triplanar_weights(dir: Vec3) -> Vec3 {
    let a = dir.abs();
    let sum = a.x + a.y + a.z;
    if sum.is_finite() && sum > f32::EPSILON {
        a / sum
    } else {
        Vec3::splat(1.0 / 3.0)
    }
}

/// The three planar UV projections of a unit direction, in the order they
/// are weighted by `triplanar_weights` (x, y, z).
pub fn triplanar_uvs(dir: Vec3) -> [(f32, f32); 3] {
    let to_uv = |a: f32, b: f32| (a * 0.5 + 0.5, b * 0.5 + 0.5);
    [to_uv(dir.z, dir.y), to_uv(dir.x, dir.z), to_uv(dir.x, dir.y)]
}

/// Seam-free lookup of a square grid over the sphere.
///
/// The grid is read through three planar projections and the samples are
/// blended by how much the direction faces each axis. This is an
/// approximation, not an equal-area mapping, but it is continuous
/// everywhere on the sphere.
pub fn sample_triplanar(grid: &Grid, dir: Vec3) -> f32 {
    let dir = sanitize_direction(dir);
    let weights = triplanar_weights(dir);
    let [zy, xz, xy] = triplanar_uvs(dir);
    let value = grid.sample_uv(zy.0, zy.1) * weights.x
        + grid.sample_uv(xz.0, xz.1) * weights.y
        + grid.sample_uv(xy.0, xy.1) * weights.z;
    if value.is_finite() { value } else { 0.0 }
}

/// Unit direction, or `+Y` for zero-length or non-finite input.
pub fn sanitize_direction(dir: Vec3) -> Vec3 {
    dir.try_normalize().unwrap_or(Vec3::Y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Vec3::X)]
    #[case(Vec3::new(1.0, -2.0, 3.0))]
    #[case(Vec3::new(-0.3, 0.3, -0.9))]
    fn weights_sum_to_one(#[case] dir: Vec3) {
        let w = triplanar_weights(dir.normalize());
        assert!((w.x + w.y + w.z - 1.0).abs() < 1e-6);
        assert!(w.min_element() >= 0.0);
    }

    #[test]
    fn constant_grid_samples_constant() {
        let grid = Grid::new(16, 0.7);
        for dir in [Vec3::X, Vec3::NEG_Y, Vec3::new(0.3, -0.4, 0.8)] {
            assert!((sample_triplanar(&grid, dir) - 0.7).abs() < 1e-5);
        }
    }

    #[rstest]
    #[case(Vec3::ZERO)]
    #[case(Vec3::new(f32::NAN, 0.0, 1.0))]
    #[case(Vec3::new(f32::INFINITY, 1.0, 0.0))]
    fn degenerate_directions_are_finite(#[case] dir: Vec3) {
        let grid = Grid::from_fn(16, |x, y| (x * y) as f32 / 225.0);
        let v = sample_triplanar(&grid, dir);
        assert!(v.is_finite());
        assert!((0.0..=1.0).contains(&v));
    }

    #[test]
    fn nearby_directions_give_nearby_values() {
        let grid = Grid::from_fn(32, |x, y| ((x as f32 * 0.3).sin() + (y as f32 * 0.2).cos()) * 0.25 + 0.5);
        // walk across the x = 0 plane where a cube map would have a seam
        let mut previous = sample_triplanar(&grid, Vec3::new(-0.01, 0.5, 0.8));
        for i in -9..=10 {
            let dir = Vec3::new(i as f32 * 0.001, 0.5, 0.8);
            let value = sample_triplanar(&grid, dir);
            assert!((value - previous).abs() < 0.01);
            previous = value;
        }
    }
}
