//! Error Types for the Detection Engine
//!
//! ## Design Philosophy
//!
//! The detection path runs inside the sensor callback, so its errors follow
//! the same rules as the rest of the core:
//!
//! 1. **Small Size**: every variant is a handful of bytes and `Copy`, cheap to
//!    return from the per-sample hot path.
//!
//! 2. **No Heap Allocation**: messages are `&'static str`, never `String`.
//!
//! 3. **Not Fatal**: an incomplete window is reported as
//!    `InsufficientData`, which callers treat as "no detection", never as a
//!    failure.
//!
//! ## Error Categories
//!
//! ### Statistics
//! - `InsufficientData`: the window does not yet hold `W` readings
//!
//! ### Configuration
//! - `InvalidProfile`: a detection profile carries unusable parameters
//! - `TooManyProfiles`: more profile chains than the detector has room for
//!
//! ### Input
//! - `InvalidSample`: a sample axis is NaN or infinite
//!
//! ```rust
//! use quakeguard_core::{DetectionError, WindowedStatistics, MagnitudeFilter};
//!
//! let stats = WindowedStatistics::new(10, MagnitudeFilter::raw()).unwrap();
//! match stats.variance() {
//!     Ok(variance) => { let _ = variance; }
//!     Err(DetectionError::InsufficientData { required, available }) => {
//!         assert_eq!((required, available), (10, 0));
//!     }
//!     Err(_) => unreachable!(),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for detection operations
pub type DetectionResult<T> = Result<T, DetectionError>;

/// Detection engine errors - kept small for the sampling path
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum DetectionError {
    /// Window has not filled up yet
    #[error("Insufficient data: need {required}, have {available}")]
    InsufficientData {
        /// Readings needed before statistics are meaningful
        required: usize,
        /// Readings currently held
        available: usize,
    },

    /// Profile parameters are out of bounds
    #[error("Invalid detection profile: {reason}")]
    InvalidProfile {
        /// Which parameter was rejected
        reason: &'static str,
    },

    /// Sample axis is NaN or infinite
    #[error("Invalid sample: axis is not a finite number")]
    InvalidSample,

    /// Detector already holds the maximum number of profile chains
    #[error("Too many detection profiles (max {max})")]
    TooManyProfiles {
        /// Capacity of the detector
        max: usize,
    },
}
