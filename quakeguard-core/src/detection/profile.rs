//! Detection Profiles
//!
//! A profile is the full configuration of one classification chain: how
//! samples become readings, how a full window is judged, and how hits turn
//! into a reported candidate. The three shipped presets are one algorithm
//! with different parameters.
//!
//! | Preset              | W  | Reading                       | Rule                              | Hits | Min mag | Cooldown |
//! |---------------------|----|-------------------------------|-----------------------------------|------|---------|----------|
//! | `variance_burst`    | 10 | raw norm                      | latest > 15 and variance > 5      | 5    | 3.0     | 30 s     |
//! | `moving_average`    | 10 | raw norm                      | mean > 15                         | 1    | 0.0     | 10 s     |
//! | `sustained_motion`  | 50 | \|norm - 9.8\|, low-pass 0.1  | mean > 1.5, >30% moving, peak > 2.25 | 1 | 0.0     | 5 s      |

use crate::constants::detection::*;
use crate::constants::time::{
    MOVING_AVERAGE_COOLDOWN_MS, SUSTAINED_PROFILE_COOLDOWN_MS, VARIANCE_PROFILE_COOLDOWN_MS,
};
use crate::constants::buffers::MAX_WINDOW_SIZE;
use crate::errors::{DetectionError, DetectionResult};
use crate::events::ProfileLabel;
use crate::sample::MagnitudeReading;
use crate::stats::{MagnitudeFilter, WindowedStatistics};

/// How a full window is judged
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ClassificationRule {
    /// Latest reading above `amplitude_threshold` and window variance above
    /// `variance_threshold`
    AmplitudeVariance {
        amplitude_threshold: f64,
        variance_threshold: f64,
    },

    /// Window mean above `mean_threshold`
    MovingAverage { mean_threshold: f64 },

    /// Mean above `mean_threshold`, more than `active_fraction` of the
    /// window above `noise_floor`, and peak above
    /// `mean_threshold × peak_factor`
    SustainedMotion {
        mean_threshold: f64,
        noise_floor: f64,
        active_fraction: f64,
        peak_factor: f64,
    },
}

/// What a rule saw in one full window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleOutcome {
    pub matched: bool,
    /// Amplitude fed to the estimators
    pub amplitude: f64,
    /// Window variance fed to the estimators
    pub variance: f64,
}

impl ClassificationRule {
    /// Judges the window. `InsufficientData` until it is full.
    pub fn evaluate(
        &self,
        stats: &WindowedStatistics,
        latest: &MagnitudeReading,
    ) -> DetectionResult<RuleOutcome> {
        let summary = stats.summary()?;

        let outcome = match *self {
            ClassificationRule::AmplitudeVariance {
                amplitude_threshold,
                variance_threshold,
            } => RuleOutcome {
                matched: latest.value > amplitude_threshold
                    && summary.variance > variance_threshold,
                amplitude: latest.value,
                variance: summary.variance,
            },

            ClassificationRule::MovingAverage { mean_threshold } => RuleOutcome {
                matched: summary.mean > mean_threshold,
                amplitude: summary.mean,
                variance: summary.variance,
            },

            ClassificationRule::SustainedMotion {
                mean_threshold,
                noise_floor,
                active_fraction,
                peak_factor,
            } => {
                let active = stats.count_above(noise_floor)? as f64;
                let required = stats.window_size() as f64 * active_fraction;

                RuleOutcome {
                    matched: summary.mean > mean_threshold
                        && active > required
                        && summary.peak > mean_threshold * peak_factor,
                    amplitude: summary.mean,
                    variance: summary.variance,
                }
            }
        };

        Ok(outcome)
    }

    /// Reference points for the confidence score; 0 disables a term
    pub fn confidence_thresholds(&self) -> (f64, f64) {
        match *self {
            ClassificationRule::AmplitudeVariance {
                amplitude_threshold,
                variance_threshold,
            } => (amplitude_threshold, variance_threshold),
            ClassificationRule::MovingAverage { mean_threshold } => (mean_threshold, 0.0),
            ClassificationRule::SustainedMotion { mean_threshold, .. } => (mean_threshold, 0.0),
        }
    }

    fn validate(&self) -> DetectionResult<()> {
        let finite = match *self {
            ClassificationRule::AmplitudeVariance {
                amplitude_threshold,
                variance_threshold,
            } => amplitude_threshold.is_finite() && variance_threshold.is_finite(),
            ClassificationRule::MovingAverage { mean_threshold } => mean_threshold.is_finite(),
            ClassificationRule::SustainedMotion {
                mean_threshold,
                noise_floor,
                active_fraction,
                peak_factor,
            } => {
                if !(0.0..=1.0).contains(&active_fraction) {
                    return Err(DetectionError::InvalidProfile {
                        reason: "active fraction must be in [0, 1]",
                    });
                }
                mean_threshold.is_finite() && noise_floor.is_finite() && peak_factor.is_finite()
            }
        };

        if finite {
            Ok(())
        } else {
            Err(DetectionError::InvalidProfile {
                reason: "rule thresholds must be finite",
            })
        }
    }
}

/// Configuration of one classification chain
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectionProfile {
    pub label: ProfileLabel,
    /// Readings per window (`W`)
    pub window_size: usize,
    pub filter: MagnitudeFilter,
    pub rule: ClassificationRule,
    /// Consecutive matching readings that confirm a detection
    pub required_hits: u32,
    pub min_reportable_magnitude: f64,
    pub magnitude_scale: f64,
    /// Minimum time between two candidates of this profile
    pub cooldown_ms: u64,
}

impl DetectionProfile {
    /// Amplitude and variance over 10 raw readings, 5 hits, M ≥ 3.0, 30 s
    pub const fn variance_burst() -> Self {
        Self {
            label: ProfileLabel::VarianceBurst,
            window_size: VARIANCE_WINDOW_SIZE,
            filter: MagnitudeFilter::raw(),
            rule: ClassificationRule::AmplitudeVariance {
                amplitude_threshold: AMPLITUDE_THRESHOLD_MPS2,
                variance_threshold: VARIANCE_THRESHOLD,
            },
            required_hits: REQUIRED_CONSECUTIVE_HITS,
            min_reportable_magnitude: MIN_REPORTABLE_MAGNITUDE,
            magnitude_scale: MAGNITUDE_SCALE,
            cooldown_ms: VARIANCE_PROFILE_COOLDOWN_MS,
        }
    }

    /// Mean of the last 10 raw readings above 15 m/s², 10 s cooldown
    pub const fn moving_average() -> Self {
        Self {
            label: ProfileLabel::MovingAverage,
            window_size: MOVING_AVERAGE_WINDOW_SIZE,
            filter: MagnitudeFilter::raw(),
            rule: ClassificationRule::MovingAverage {
                mean_threshold: MOVING_AVERAGE_THRESHOLD_MPS2,
            },
            required_hits: 1,
            min_reportable_magnitude: 0.0,
            magnitude_scale: MAGNITUDE_SCALE,
            cooldown_ms: MOVING_AVERAGE_COOLDOWN_MS,
        }
    }

    /// Gravity-compensated, smoothed motion sustained over 50 readings
    pub const fn sustained_motion() -> Self {
        Self {
            label: ProfileLabel::SustainedMotion,
            window_size: SUSTAINED_WINDOW_SIZE,
            filter: MagnitudeFilter::compensated(STANDARD_GRAVITY_MPS2, LOW_PASS_ALPHA),
            rule: ClassificationRule::SustainedMotion {
                mean_threshold: SUSTAINED_MEAN_THRESHOLD_MPS2,
                noise_floor: SUSTAINED_NOISE_FLOOR_MPS2,
                active_fraction: SUSTAINED_ACTIVE_FRACTION,
                peak_factor: SUSTAINED_PEAK_FACTOR,
            },
            required_hits: 1,
            min_reportable_magnitude: 0.0,
            magnitude_scale: MAGNITUDE_SCALE,
            cooldown_ms: SUSTAINED_PROFILE_COOLDOWN_MS,
        }
    }

    pub fn validate(&self) -> DetectionResult<()> {
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(DetectionError::InvalidProfile {
                reason: "window size must be in 1..=MAX_WINDOW_SIZE",
            });
        }
        if self.required_hits == 0 {
            return Err(DetectionError::InvalidProfile {
                reason: "required hits must be at least 1",
            });
        }
        if !self.magnitude_scale.is_finite() || self.magnitude_scale <= 0.0 {
            return Err(DetectionError::InvalidProfile {
                reason: "magnitude scale must be positive",
            });
        }
        if !self.min_reportable_magnitude.is_finite() {
            return Err(DetectionError::InvalidProfile {
                reason: "minimum magnitude must be finite",
            });
        }
        self.filter.validate()?;
        self.rule.validate()
    }
}

impl Default for DetectionProfile {
    fn default() -> Self {
        Self::variance_burst()
    }
}
