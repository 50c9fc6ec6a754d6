use crate::config::FaultType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateType {
    Continental,
    Oceanic,
}

impl PlateType {
    pub fn sign(self) -> f32 {
        match self {
            PlateType::Continental => 1.0,
            PlateType::Oceanic => -1.0,
        }
    }
}

/// A Voronoi seed of the plate field. Lives only for one synthesis run.
#[derive(Debug, Clone)]
pub struct PlateSeed {
    /// Grid position, x in `[0, size)` on the wrapped axis.
    pub x: f32,
    pub y: f32,
    /// Signed offset from the mid elevation of 0.5.
    pub elevation_bias: f32,
    pub plate_type: PlateType,
    /// Divides distances to this seed; larger plates claim more cells.
    pub size_bias: f32,
    /// Horizontal shift per row.
    pub skew: f32,
    /// Boundary behaviour, already resolved for `FaultType::Mixed`.
    pub fault: FaultType,
}

impl PlateSeed {
    /// Effective x of the seed on row `y`.
    #[inline]
    pub fn x_at_row(&self, y: f32) -> f32 {
        self.x + self.skew * y
    }

    /// Signed boundary contribution per unit of boundary proximity.
    pub fn fault_term(&self) -> f32 {
        match self.fault {
            FaultType::Ridge => 1.0,
            FaultType::Trench => -1.0,
            FaultType::Shear => crate::constants::SHEAR_FACTOR * self.plate_type.sign(),
            // resolved when the seed is created
            FaultType::Mixed => 0.0,
        }
    }
}
