//! Detection Outputs and Seismic Events
//!
//! ## Overview
//!
//! Confirmed motion moves through three shapes on its way out of the core:
//!
//! ```text
//! DetectionClassifier ──→ DetectionCandidate   (per profile, may be dropped
//!                                               by the global cooldown)
//! Detector            ──→ Detection            (candidate + event id, one per
//!                                               cooldown window device-wide)
//! dispatcher          ──→ SeismicEvent         (detection stamped with
//!                                               position and place name)
//! ```
//!
//! The first two are `Copy` and live on the sampling path. `SeismicEvent`
//! carries an owned place name and is only built off the sampling path,
//! after reverse geocoding.
//!
//! ## Immutability
//!
//! A `SeismicEvent` is created once through [`SeismicEventBuilder`] and
//! exposes read-only accessors. Storage, notification and the remote API all
//! see the same value.

use core::fmt;

use crate::location::LocationFix;
use crate::time::Timestamp;

/// Which classification preset produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProfileLabel {
    /// Amplitude and window variance over consecutive readings
    VarianceBurst,
    /// Plain moving average of raw magnitudes
    MovingAverage,
    /// Gravity-compensated, low-pass filtered sustained motion
    SustainedMotion,
    /// User-defined profile
    Custom(u8),
}

impl ProfileLabel {
    pub const fn name(&self) -> &'static str {
        match self {
            ProfileLabel::VarianceBurst => "variance_burst",
            ProfileLabel::MovingAverage => "moving_average",
            ProfileLabel::SustainedMotion => "sustained_motion",
            ProfileLabel::Custom(_) => "custom",
        }
    }
}

/// Output of one classifier when its confirmation rule fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionCandidate {
    pub profile: ProfileLabel,
    /// Estimated magnitude in [0, 10]
    pub magnitude: f64,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Amplitude the estimate was computed from
    pub amplitude: f64,
    /// Window variance the estimate was computed from
    pub variance: f64,
    pub detected_at: Timestamp,
}

/// Monotonic identifier assigned by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt-{}", self.0)
    }
}

/// Candidate that passed the device-wide cooldown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub id: EventId,
    pub candidate: DetectionCandidate,
    /// Last known position when the detection was confirmed
    pub position: Option<LocationFix>,
}

impl Detection {
    pub fn occurred_at(&self) -> Timestamp {
        self.candidate.detected_at
    }

    /// Stamps the detection with the last known position
    pub fn with_position(mut self, position: Option<LocationFix>) -> Self {
        self.position = position;
        self
    }
}

/// Immutable record of a detected earthquake
#[cfg(feature = "std")]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeismicEvent {
    id: EventId,
    magnitude: f64,
    confidence: f64,
    latitude: f64,
    longitude: f64,
    location_name: String,
    depth: f64,
    occurred_at: Timestamp,
    profile: ProfileLabel,
}

#[cfg(feature = "std")]
impl SeismicEvent {
    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn location_name(&self) -> &str {
        &self.location_name
    }

    /// Depth in km; handset detections cannot observe it and report 0
    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }

    pub fn profile(&self) -> ProfileLabel {
        self.profile
    }
}

/// Builder for [`SeismicEvent`]
#[cfg(feature = "std")]
pub struct SeismicEventBuilder {
    detection: Detection,
    location_name: Option<String>,
    depth: f64,
}

#[cfg(feature = "std")]
impl SeismicEventBuilder {
    pub fn new(detection: Detection) -> Self {
        Self {
            detection,
            location_name: None,
            depth: 0.0,
        }
    }

    pub fn location_name(mut self, name: impl Into<String>) -> Self {
        self.location_name = Some(name.into());
        self
    }

    pub fn depth(mut self, depth_km: f64) -> Self {
        self.depth = depth_km;
        self
    }

    /// Events without a known position are stamped at 0.0 / 0.0
    pub fn build(self) -> SeismicEvent {
        let candidate = self.detection.candidate;
        let (latitude, longitude) = self
            .detection
            .position
            .map(|fix| (fix.latitude, fix.longitude))
            .unwrap_or((0.0, 0.0));

        SeismicEvent {
            id: self.detection.id,
            magnitude: candidate.magnitude,
            confidence: candidate.confidence,
            latitude,
            longitude,
            location_name: self
                .location_name
                .unwrap_or_else(|| String::from("Unknown Location")),
            depth: self.depth,
            occurred_at: candidate.detected_at,
            profile: candidate.profile,
        }
    }
}
