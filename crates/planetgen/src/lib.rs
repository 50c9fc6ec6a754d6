pub mod config;
pub mod constants;
pub mod erosion;
pub mod error;
pub mod generator;
pub mod grid;
pub mod hydrology;
pub mod mesh_data;
pub mod planet;
pub mod plate;
pub mod sampler;
pub mod smoothing;
pub mod tectonics;
pub mod tools;

pub use config::{PlanetGenConfig, get_config, reload_config};
pub use error::ConfigError;
pub use generator::{CancellationToken, Generation, JobSlot, Phase, PipelineJob, StepOutcome, generate};
pub use mesh_data::MeshData;
pub use planet::{PlanetSurface, WaterSample};
