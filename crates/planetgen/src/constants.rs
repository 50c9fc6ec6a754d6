// Plates
/// Exponent applied to the nearest/second-nearest distance ratio.
/// Higher values squeeze the boundary term into a narrower band.
pub const BOUNDARY_SHARPNESS: f32 = 8.0;
/// Boundary term relative to `plate_delta`.
pub const BOUNDARY_GAIN: f32 = 1.6;
/// Shear boundaries only get this fraction of the ridge/trench term.
pub const SHEAR_FACTOR: f32 = 0.35;
/// Maximum domain warp, as a fraction of the grid side, at `jitter = 1`.
pub const WARP_FRACTION: f32 = 0.04;
pub const WARP_FREQUENCY: f64 = 2.5;
pub const MAX_SKEW: f32 = 0.25;
pub const MIN_SIZE_BIAS: f32 = 0.1;

// Erosion
pub const DROPLET_STEP_BUDGET: usize = 30;
/// Droplets start at rest and pick up speed on their first downhill step.
pub const DROPLET_INITIAL_SPEED: f32 = 0.0;
pub const DROPLET_INITIAL_WATER: f32 = 1.0;
pub const SEDIMENT_CAPACITY_FACTOR: f32 = 4.0;
pub const MIN_SEDIMENT_CAPACITY_SLOPE: f32 = 0.01;
pub const MIN_DROPLET_SPEED: f32 = 1e-4;
pub const MIN_DROPLET_WATER: f32 = 1e-3;

// Hydrology
/// Normalized accumulated flow above which a cell counts as river.
pub const RIVER_FLOW_THRESHOLD: f32 = 0.01;
/// Power-law compression of normalized flow into river intensity.
pub const RIVER_FLOW_EXPONENT: f32 = 0.5;
/// A lake reaches full intensity at this multiple of `lake_threshold`.
pub const LAKE_FULL_DEPTH: f32 = 4.0;

// Mesh
pub const WELD_TOLERANCE: f32 = 1e-5;
/// Width of the latitude band over which ice fades in.
pub const ICE_RAMP: f32 = 0.04;
pub const MIN_VERTEX_RADIUS: f32 = 1e-3;

// Stage salts mixed into the generation seed
pub const PLATE_SALT: u64 = 0x504C_4154_4553;
pub const WARP_SALT: u64 = 0x5741_5250;
pub const EROSION_SALT: u64 = 0x4552_4F44_45;
