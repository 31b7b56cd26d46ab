//! Windowed Statistics over Accelerometer Magnitudes
//!
//! ## Signal Conditioning
//!
//! Each sample is reduced to one scalar before it enters the window:
//!
//! ```text
//! m = sqrt(x² + y² + z²)                 (always)
//! m = |m - g|                            (gravity-compensating profiles)
//! f = α·m + (1-α)·f_prev                 (low-pass profiles, f_prev starts at 0)
//! ```
//!
//! ## Statistics
//!
//! Mean and *population* variance (divide by `W`, not `W-1`) are computed on
//! demand in O(W). Both report `InsufficientData` until the window holds
//! exactly `W` readings, which is what keeps short streams from ever
//! producing a detection.

use crate::buffer::MagnitudeWindow;
use crate::errors::{DetectionError, DetectionResult};
use crate::sample::{MagnitudeReading, SensorSample};

/// How raw samples are turned into window readings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MagnitudeFilter {
    /// Subtract this constant from the norm and take the absolute value
    pub gravity_compensation: Option<f64>,
    /// Exponential moving-average smoothing factor in (0, 1]
    pub low_pass_alpha: Option<f64>,
}

impl MagnitudeFilter {
    /// Plain Euclidean norm, no compensation, no smoothing
    pub const fn raw() -> Self {
        Self {
            gravity_compensation: None,
            low_pass_alpha: None,
        }
    }

    /// Gravity-compensated and low-pass filtered
    pub const fn compensated(gravity: f64, alpha: f64) -> Self {
        Self {
            gravity_compensation: Some(gravity),
            low_pass_alpha: Some(alpha),
        }
    }

    pub fn validate(&self) -> DetectionResult<()> {
        if let Some(alpha) = self.low_pass_alpha {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(DetectionError::InvalidProfile {
                    reason: "low-pass alpha must be in (0, 1]",
                });
            }
        }
        if let Some(gravity) = self.gravity_compensation {
            if !gravity.is_finite() || gravity < 0.0 {
                return Err(DetectionError::InvalidProfile {
                    reason: "gravity compensation must be a finite, non-negative value",
                });
            }
        }
        Ok(())
    }
}

impl Default for MagnitudeFilter {
    fn default() -> Self {
        Self::raw()
    }
}

/// Summary of a full window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSummary {
    pub mean: f64,
    /// Population variance
    pub variance: f64,
    pub peak: f64,
}

/// Derives magnitudes from samples and keeps the last `W` of them
#[derive(Debug, Clone)]
pub struct WindowedStatistics {
    window: MagnitudeWindow,
    filter: MagnitudeFilter,
    /// Low-pass state; starts at rest
    filtered: f64,
}

impl WindowedStatistics {
    pub fn new(window_size: usize, filter: MagnitudeFilter) -> DetectionResult<Self> {
        filter.validate()?;

        Ok(Self {
            window: MagnitudeWindow::new(window_size)?,
            filter,
            filtered: 0.0,
        })
    }

    /// Converts a sample to a reading and appends it to the window
    pub fn ingest(&mut self, sample: &SensorSample) -> MagnitudeReading {
        let mut value = sample.norm();

        if let Some(gravity) = self.filter.gravity_compensation {
            value = libm::fabs(value - gravity);
        }

        if let Some(alpha) = self.filter.low_pass_alpha {
            self.filtered = alpha * value + (1.0 - alpha) * self.filtered;
            value = self.filtered;
        }

        let reading = MagnitudeReading {
            value,
            observed_at: sample.observed_at,
        };
        self.window.push(reading);
        reading
    }

    /// Window mean, available once the window is full
    pub fn mean(&self) -> DetectionResult<f64> {
        self.ensure_full()?;
        Ok(self.window.values().sum::<f64>() / self.window.len() as f64)
    }

    /// Population variance, available once the window is full
    pub fn variance(&self) -> DetectionResult<f64> {
        let mean = self.mean()?;
        let sum_sq: f64 = self
            .window
            .values()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum();
        Ok(sum_sq / self.window.len() as f64)
    }

    /// Mean, variance and peak in one call
    pub fn summary(&self) -> DetectionResult<WindowSummary> {
        let mean = self.mean()?;
        let variance = self.variance()?;
        let peak = self.window.values().fold(f64::MIN, f64::max);
        Ok(WindowSummary { mean, variance, peak })
    }

    /// Number of readings strictly above `threshold`, once the window is full
    pub fn count_above(&self, threshold: f64) -> DetectionResult<usize> {
        self.ensure_full()?;
        Ok(self.window.values().filter(|v| *v > threshold).count())
    }

    pub fn window(&self) -> &MagnitudeWindow {
        &self.window
    }

    pub fn window_size(&self) -> usize {
        self.window.capacity()
    }

    pub fn is_ready(&self) -> bool {
        self.window.is_full()
    }

    /// Drops all readings and the low-pass state
    pub fn reset(&mut self) {
        self.window.clear();
        self.filtered = 0.0;
    }

    fn ensure_full(&self) -> DetectionResult<()> {
        if self.window.is_full() {
            Ok(())
        } else {
            Err(DetectionError::InsufficientData {
                required: self.window.capacity(),
                available: self.window.len(),
            })
        }
    }
}
