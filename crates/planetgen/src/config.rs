use crate::error::ConfigError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::{Mutex, OnceLock, PoisonError};

pub const CONFIG_FILE: &str = "planetgen_config.toml";

static CONFIG: OnceLock<Mutex<PlanetGenConfig>> = OnceLock::new();

/// Get a copy of the current configuration, loading from file if not already loaded.
/// Falls back to defaults when the file is missing or invalid.
pub fn get_config() -> PlanetGenConfig {
    let config_mutex = CONFIG.get_or_init(|| Mutex::new(load_or_default(CONFIG_FILE)));
    config_mutex
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn reload_config() -> Result<(), ConfigError> {
    reload_config_from_file(CONFIG_FILE)
}

fn load_or_default(path: &str) -> PlanetGenConfig {
    match PlanetGenConfig::load_from_file(path) {
        Ok(config) => config,
        Err(err) => {
            warn!("Using default planet config ({path}: {err})");
            PlanetGenConfig::default()
        }
    }
}

fn reload_config_from_file(path: &str) -> Result<(), ConfigError> {
    let new_config = PlanetGenConfig::load_from_file(path)?;
    let config_mutex = CONFIG.get_or_init(|| Mutex::new(new_config.clone()));
    *config_mutex.lock().unwrap_or_else(PoisonError::into_inner) = new_config;
    Ok(())
}

/// How plate boundaries modify the base elevation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultType {
    /// Boundaries are raised into mountain ranges.
    Ridge,
    /// Boundaries are sunk into trenches.
    Trench,
    /// Smaller signed offset following the plate's own sign.
    Shear,
    /// Each plate picks one of the three.
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetGenConfig {
    pub generation: GenerationConfig,
    pub plates: PlateConfig,
    pub erosion: ErosionConfig,
    pub hydrology: HydrologyConfig,
    pub mesh: MeshConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub seed: u64,
    /// Side length of the square height grid.
    pub resolution: usize,
    pub smooth_passes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateConfig {
    pub plate_count: usize,
    /// Seeds draw their size bias from `1 ± plate_size_variance`.
    pub plate_size_variance: f32,
    /// Skew seeds per row so the wrapped seam does not repeat.
    pub desymmetrize_tiling: bool,
    /// Amplitude of the noise warp applied to plate boundaries.
    pub jitter: f32,
    /// Elevation contrast between uplifted and subsided plates.
    pub plate_delta: f32,
    pub fault_type: FaultType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErosionConfig {
    pub iterations: usize,
    pub inertia: f32,
    pub gravity: f32,
    pub evaporation_rate: f32,
    pub erosion_rate: f32,
    pub deposition_rate: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrologyConfig {
    pub sea_level: f32,
    /// Height removed under full water intensity.
    pub river_depth_scale: f32,
    /// Minimum fill depth for a depression to count as a lake.
    pub lake_threshold: f32,
    /// Water intensity above which a point is reported as water.
    pub water_threshold: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshConfig {
    pub base_radius: f32,
    pub height_scale: f32,
    pub subdivision_level: u32,
    /// Absolute `y` of the unit direction above which land is ice.
    pub ice_cap_latitude_threshold: f32,
}

impl Default for PlanetGenConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig {
                seed: 42,
                resolution: 256,
                smooth_passes: 2,
            },
            plates: PlateConfig {
                plate_count: 9,
                plate_size_variance: 0.3,
                desymmetrize_tiling: true,
                jitter: 0.6,
                plate_delta: 0.2,
                fault_type: FaultType::Mixed,
            },
            erosion: ErosionConfig {
                iterations: 80_000,
                inertia: 0.3,
                gravity: 4.0,
                evaporation_rate: 0.02,
                erosion_rate: 0.3,
                deposition_rate: 0.3,
            },
            hydrology: HydrologyConfig {
                sea_level: 0.53,
                river_depth_scale: 0.02,
                lake_threshold: 0.005,
                water_threshold: 0.3,
            },
            mesh: MeshConfig {
                base_radius: 50.0,
                height_scale: 8.0,
                subdivision_level: 6,
                ice_cap_latitude_threshold: 0.92,
            },
        }
    }
}

impl PlanetGenConfig {
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns a copy with every value clamped into the range the pipeline
    /// can handle. Non-finite floats fall back to the default value.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let g = &self.generation;
        let p = &self.plates;
        let e = &self.erosion;
        let h = &self.hydrology;
        let m = &self.mesh;

        let base_radius = clamp_f32("mesh.base_radius", m.base_radius, 0.1..=10_000.0, d.mesh.base_radius);

        Self {
            generation: GenerationConfig {
                seed: g.seed,
                resolution: clamp_usize("generation.resolution", g.resolution, 16..=2048),
                smooth_passes: clamp_usize("generation.smooth_passes", g.smooth_passes, 0..=16),
            },
            plates: PlateConfig {
                plate_count: clamp_usize("plates.plate_count", p.plate_count, 1..=64),
                plate_size_variance: clamp_f32(
                    "plates.plate_size_variance",
                    p.plate_size_variance,
                    0.0..=0.9,
                    d.plates.plate_size_variance,
                ),
                desymmetrize_tiling: p.desymmetrize_tiling,
                jitter: clamp_f32("plates.jitter", p.jitter, 0.0..=1.0, d.plates.jitter),
                plate_delta: clamp_f32("plates.plate_delta", p.plate_delta, 0.0..=0.5, d.plates.plate_delta),
                fault_type: p.fault_type,
            },
            erosion: ErosionConfig {
                iterations: clamp_usize("erosion.iterations", e.iterations, 0..=2_000_000),
                inertia: clamp_f32("erosion.inertia", e.inertia, 0.0..=0.99, d.erosion.inertia),
                gravity: clamp_f32("erosion.gravity", e.gravity, 0.1..=20.0, d.erosion.gravity),
                evaporation_rate: clamp_f32(
                    "erosion.evaporation_rate",
                    e.evaporation_rate,
                    0.0..=0.5,
                    d.erosion.evaporation_rate,
                ),
                erosion_rate: clamp_f32("erosion.erosion_rate", e.erosion_rate, 0.0..=1.0, d.erosion.erosion_rate),
                deposition_rate: clamp_f32(
                    "erosion.deposition_rate",
                    e.deposition_rate,
                    0.0..=1.0,
                    d.erosion.deposition_rate,
                ),
            },
            hydrology: HydrologyConfig {
                sea_level: clamp_f32("hydrology.sea_level", h.sea_level, 0.0..=1.0, d.hydrology.sea_level),
                river_depth_scale: clamp_f32(
                    "hydrology.river_depth_scale",
                    h.river_depth_scale,
                    0.0..=0.2,
                    d.hydrology.river_depth_scale,
                ),
                lake_threshold: clamp_f32(
                    "hydrology.lake_threshold",
                    h.lake_threshold,
                    1e-4..=0.5,
                    d.hydrology.lake_threshold,
                ),
                water_threshold: clamp_f32(
                    "hydrology.water_threshold",
                    h.water_threshold,
                    0.0..=1.0,
                    d.hydrology.water_threshold,
                ),
            },
            mesh: MeshConfig {
                base_radius,
                height_scale: clamp_f32("mesh.height_scale", m.height_scale, 0.0..=base_radius, d.mesh.height_scale.min(base_radius)),
                subdivision_level: clamp_u32("mesh.subdivision_level", m.subdivision_level, 0..=7),
                ice_cap_latitude_threshold: clamp_f32(
                    "mesh.ice_cap_latitude_threshold",
                    m.ice_cap_latitude_threshold,
                    0.0..=1.0,
                    d.mesh.ice_cap_latitude_threshold,
                ),
            },
        }
    }
}

fn clamp_f32(name: &str, value: f32, range: RangeInclusive<f32>, fallback: f32) -> f32 {
    if !value.is_finite() {
        warn!("{name} is not finite, using {fallback}");
        return fallback;
    }
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        warn!("{name} = {value} out of range, clamped to {clamped}");
    }
    clamped
}

fn clamp_usize(name: &str, value: usize, range: RangeInclusive<usize>) -> usize {
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        warn!("{name} = {value} out of range, clamped to {clamped}");
    }
    clamped
}

fn clamp_u32(name: &str, value: u32, range: RangeInclusive<u32>) -> u32 {
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        warn!("{name} = {value} out of range, clamped to {clamped}");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_is_already_sane() {
        let config = PlanetGenConfig::default();
        assert_eq!(config.sanitized(), config);
    }

    #[test]
    fn toml_roundtrip_keeps_values() {
        let mut config = PlanetGenConfig::default();
        config.plates.fault_type = FaultType::Trench;
        config.generation.seed = 1234;
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("fault_type = \"trench\""));
        let parsed = PlanetGenConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn saved_file_loads_back() {
        let mut config = PlanetGenConfig::default();
        config.generation.seed = 99;
        config.hydrology.sea_level = 0.4;
        config.plates.fault_type = FaultType::Shear;
        let path = std::env::temp_dir().join(format!("planetgen_save_{}.toml", std::process::id()));
        let path = path.to_str().unwrap();

        config.save_to_file(path).unwrap();
        let loaded = PlanetGenConfig::load_from_file(path);
        std::fs::remove_file(path).unwrap();
        assert_eq!(loaded.unwrap(), config);
    }

    #[test]
    fn parse_error_is_reported() {
        let err = PlanetGenConfig::from_toml_str("[generation]\nseed = \"nope\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = PlanetGenConfig::load_from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[rstest]
    #[case(f32::NAN, 0.53)]
    #[case(f32::INFINITY, 0.53)]
    #[case(-0.5, 0.0)]
    #[case(1.5, 1.0)]
    #[case(0.25, 0.25)]
    fn sea_level_is_sanitized(#[case] input: f32, #[case] expected: f32) {
        let mut config = PlanetGenConfig::default();
        config.hydrology.sea_level = input;
        assert_eq!(config.sanitized().hydrology.sea_level, expected);
    }

    #[rstest]
    #[case(0, 16)]
    #[case(4, 16)]
    #[case(300, 300)]
    #[case(100_000, 2048)]
    fn resolution_is_clamped(#[case] input: usize, #[case] expected: usize) {
        let mut config = PlanetGenConfig::default();
        config.generation.resolution = input;
        assert_eq!(config.sanitized().generation.resolution, expected);
    }

    #[test]
    fn height_scale_never_exceeds_radius() {
        let mut config = PlanetGenConfig::default();
        config.mesh.base_radius = 2.0;
        config.mesh.height_scale = 100.0;
        let sane = config.sanitized();
        assert!(sane.mesh.height_scale <= sane.mesh.base_radius);
    }
}
