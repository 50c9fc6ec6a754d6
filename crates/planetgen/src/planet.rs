use crate::config::PlanetGenConfig;
use crate::constants::MIN_VERTEX_RADIUS;
use crate::grid::Grid;
use crate::sampler::sample_triplanar;
use glam::Vec3;

/// Water state at one point of the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterSample {
    /// Terrain height in `[0, 1]`.
    pub height: f32,
    /// Level of the water body covering the point; equals `height` on dry land.
    pub water_height: f32,
    pub water_intensity: f32,
    pub is_water: bool,
}

/// The finished, read-only fields of a generated planet.
///
/// Nothing mutates a surface once it is built, so it can be shared across
/// threads and queried while a newer planet is being generated.
#[derive(Debug, Clone)]
pub struct PlanetSurface {
    height: Grid,
    water: Grid,
    water_surface: Grid,
    config: PlanetGenConfig,
}

impl PlanetSurface {
    pub fn new(height: Grid, water: Grid, water_surface: Grid, config: PlanetGenConfig) -> Self {
        Self {
            height,
            water,
            water_surface,
            config,
        }
    }

    pub fn config(&self) -> &PlanetGenConfig {
        &self.config
    }

    pub fn height_field(&self) -> &Grid {
        &self.height
    }

    pub fn water_field(&self) -> &Grid {
        &self.water
    }

    pub fn water_surface_field(&self) -> &Grid {
        &self.water_surface
    }

    /// Terrain height in `[0, 1]` along `dir`.
    pub fn height_at(&self, dir: Vec3) -> f32 {
        sample_triplanar(&self.height, dir).clamp(0.0, 1.0)
    }

    /// Distance from the planet centre to the terrain along `dir`.
    pub fn radius_at(&self, dir: Vec3) -> f32 {
        let mesh = &self.config.mesh;
        let radius = mesh.base_radius + (self.height_at(dir) - self.config.hydrology.sea_level) * mesh.height_scale;
        if radius.is_finite() && radius >= MIN_VERTEX_RADIUS {
            radius
        } else {
            mesh.base_radius
        }
    }

    pub fn water_at(&self, dir: Vec3) -> WaterSample {
        let height = self.height_at(dir);
        let water_intensity = sample_triplanar(&self.water, dir).clamp(0.0, 1.0);
        let water_height = sample_triplanar(&self.water_surface, dir).clamp(0.0, 1.0).max(height);
        WaterSample {
            height,
            water_height,
            water_intensity,
            is_water: water_intensity > self.config.hydrology.water_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn surface(height: f32, water: f32) -> PlanetSurface {
        let size = 16;
        PlanetSurface::new(
            Grid::new(size, height),
            Grid::new(size, water),
            Grid::new(size, height.max(0.53)),
            PlanetGenConfig::default(),
        )
    }

    #[rstest]
    #[case(0.0, false)]
    #[case(0.29, false)]
    #[case(0.31, true)]
    #[case(1.0, true)]
    fn is_water_follows_threshold(#[case] water: f32, #[case] expected: bool) {
        let sample = surface(0.4, water).water_at(Vec3::Z);
        assert_eq!(sample.is_water, expected);
    }

    #[test]
    fn water_sits_on_or_above_terrain() {
        let sample = surface(0.4, 1.0).water_at(Vec3::new(0.2, 0.4, -0.9));
        assert!((sample.height - 0.4).abs() < 1e-5);
        assert!((sample.water_height - 0.53).abs() < 1e-5);
    }

    #[test]
    fn radius_is_displaced_from_sea_level() {
        let config = PlanetGenConfig::default();
        let s = surface(0.63, 0.0);
        let expected = config.mesh.base_radius + 0.1 * config.mesh.height_scale;
        assert!((s.radius_at(Vec3::X) - expected).abs() < 1e-3);
    }

    #[test]
    fn radius_never_collapses() {
        let mut config = PlanetGenConfig::default();
        config.mesh.base_radius = 0.5;
        config.mesh.height_scale = 0.5;
        config.hydrology.sea_level = 1.0;
        let s = PlanetSurface::new(Grid::new(16, 0.0), Grid::new(16, 0.0), Grid::new(16, 0.0), config);
        assert!(s.radius_at(Vec3::Y) >= MIN_VERTEX_RADIUS);
    }

    #[test]
    fn surface_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PlanetSurface>();
    }
}
