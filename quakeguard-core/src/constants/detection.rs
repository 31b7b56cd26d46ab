//! Detection Thresholds and Signal Conditioning
//!
//! Values observed in the field-tested handset detectors. Accelerometer
//! readings are in m/s² and include gravity unless a profile compensates
//! for it.

// ===== AMPLITUDE / VARIANCE CLASSIFIER =====

/// Instantaneous magnitude a reading must exceed to count as a hit (m/s²).
///
/// A handset at rest reads ~9.8 m/s²; 15 m/s² requires strong shaking.
pub const AMPLITUDE_THRESHOLD_MPS2: f64 = 15.0;

/// Minimum population variance over a full window.
///
/// Separates irregular, earthquake-like motion from steady vibration
/// (a phone on a running washing machine has high amplitude but low
/// variance).
pub const VARIANCE_THRESHOLD: f64 = 5.0;

/// Window size of the amplitude/variance classifier (readings).
pub const VARIANCE_WINDOW_SIZE: usize = 10;

/// Consecutive qualifying readings needed to confirm a detection.
pub const REQUIRED_CONSECUTIVE_HITS: u32 = 5;

/// Smallest estimated magnitude that is reported.
pub const MIN_REPORTABLE_MAGNITUDE: f64 = 3.0;

/// Multiplier applied to `log10(0.7·amplitude + 0.3·variance)`.
pub const MAGNITUDE_SCALE: f64 = 1.5;

/// Weight of amplitude in the magnitude and confidence blends.
pub const AMPLITUDE_WEIGHT: f64 = 0.7;

/// Weight of variance in the magnitude and confidence blends.
pub const VARIANCE_WEIGHT: f64 = 0.3;

/// Upper bound of the reported magnitude scale.
pub const MAX_MAGNITUDE: f64 = 10.0;

// ===== MOVING-AVERAGE CLASSIFIER =====

/// Moving-average threshold of the secondary profile (m/s²).
pub const MOVING_AVERAGE_THRESHOLD_MPS2: f64 = 15.0;

/// Readings averaged by the secondary profile.
pub const MOVING_AVERAGE_WINDOW_SIZE: usize = 10;

// ===== SUSTAINED-MOTION CLASSIFIER =====

/// Standard gravity subtracted by gravity-compensating profiles (m/s²).
pub const STANDARD_GRAVITY_MPS2: f64 = 9.8;

/// Smoothing factor of the exponential low-pass filter.
///
/// `filtered = α·new + (1-α)·filtered`
pub const LOW_PASS_ALPHA: f64 = 0.1;

/// Window size of the sustained-motion profile (readings).
pub const SUSTAINED_WINDOW_SIZE: usize = 50;

/// Mean filtered magnitude a sustained-motion window must exceed (m/s²).
pub const SUSTAINED_MEAN_THRESHOLD_MPS2: f64 = 1.5;

/// Filtered magnitude above which a reading counts as movement (m/s²).
pub const SUSTAINED_NOISE_FLOOR_MPS2: f64 = 0.1;

/// Fraction of the window that must be movement.
pub const SUSTAINED_ACTIVE_FRACTION: f64 = 0.3;

/// Peak must exceed `mean threshold × factor`.
pub const SUSTAINED_PEAK_FACTOR: f64 = 1.5;
