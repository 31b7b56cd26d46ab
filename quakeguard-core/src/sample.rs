//! Raw sensor samples and the scalar readings derived from them.

use crate::time::Timestamp;

/// One tri-axial accelerometer sample (m/s²).
///
/// Produced by the sample source per callback and consumed immediately;
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Device timestamp of the measurement
    pub observed_at: Timestamp,
}

impl SensorSample {
    pub const fn new(x: f32, y: f32, z: f32, observed_at: Timestamp) -> Self {
        Self { x, y, z, observed_at }
    }

    /// True when all three axes are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Euclidean norm `sqrt(x²+y²+z²)`
    pub fn norm(&self) -> f64 {
        let (x, y, z) = (self.x as f64, self.y as f64, self.z as f64);
        libm::sqrt(x * x + y * y + z * z)
    }
}

/// Scalar magnitude derived from a [`SensorSample`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MagnitudeReading {
    pub value: f64,
    pub observed_at: Timestamp,
}
