//! Streaming seismic detection engine for QuakeGuard
//!
//! Turns a stream of tri-axial accelerometer samples into confirmed
//! earthquake detections. Designed to run inside the sensor callback:
//!
//! Key constraints:
//! - No heap allocation on the sampling path
//! - O(W) work per sample and profile, no blocking I/O
//! - Deterministic under an injected clock
//!
//! ```
//! use quakeguard_core::{Detector, FixedTime, SensorSample};
//!
//! let mut detector = Detector::standard(FixedTime::new(0)).unwrap();
//!
//! // A phone at rest never triggers
//! for t in 0..100 {
//!     detector.clock_mut().advance(20);
//!     let sample = SensorSample::new(0.0, 0.0, 9.8, t * 20);
//!     assert!(detector.ingest(&sample).unwrap().is_none());
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

pub(crate) mod macros;

pub mod buffer;
pub mod constants;
pub mod detection;
pub mod errors;
pub mod events;
pub mod location;
pub mod sample;
pub mod stats;
pub mod time;

// Public API
pub use detection::{
    ClassificationRule, DetectionClassifier, DetectionProfile, Detector, EventDeduplicator,
};
pub use errors::{DetectionError, DetectionResult};
pub use events::{Detection, DetectionCandidate, EventId, ProfileLabel};
pub use location::LocationFix;
pub use sample::{MagnitudeReading, SensorSample};
pub use stats::{MagnitudeFilter, WindowSummary, WindowedStatistics};
pub use time::{FixedTime, TimeSource, Timestamp};

#[cfg(feature = "std")]
pub use events::{SeismicEvent, SeismicEventBuilder};
#[cfg(feature = "std")]
pub use location::{location_cell, LocationHandle, LocationPublisher};
#[cfg(feature = "std")]
pub use time::{ManualClock, SystemTime};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
