//! Detector: profile chains, global deduplication and an injectable clock.
//!
//! ```text
//!                     ┌─→ DetectionClassifier (variance_burst) ─┐
//! SensorSample ──→ ───┼─→ DetectionClassifier (moving_average) ─┼─→ EventDeduplicator ──→ Detection
//!                     └─→ DetectionClassifier (…)              ─┘
//! ```
//!
//! Every chain sees every sample so all windows stay current. When several
//! chains confirm on the same sample, the first one in profile order that
//! the deduplicator admits wins; the rest are dropped.
//!
//! Everything here runs synchronously on the sampling path in O(W) per
//! chain and never allocates.

use heapless::Vec;

use crate::constants::buffers::MAX_PROFILES;
use crate::constants::time::GLOBAL_COOLDOWN_MS;
use crate::errors::{DetectionError, DetectionResult};
use crate::events::{Detection, EventId};
use crate::macros::log_info;
use crate::sample::SensorSample;
use crate::time::TimeSource;

use super::classifier::DetectionClassifier;
use super::dedup::EventDeduplicator;
use super::profile::DetectionProfile;

/// Explicit detector instance owning all detection state
pub struct Detector<T: TimeSource> {
    chains: Vec<DetectionClassifier, MAX_PROFILES>,
    dedup: EventDeduplicator,
    clock: T,
    next_id: u64,
}

impl<T: TimeSource> Detector<T> {
    /// Detector with no profiles and the given global cooldown
    pub fn new(clock: T, global_cooldown_ms: u64) -> Self {
        Self {
            chains: Vec::new(),
            dedup: EventDeduplicator::new(global_cooldown_ms),
            clock,
            next_id: 1,
        }
    }

    /// Amplitude/variance and moving-average chains behind a 30 s global
    /// cooldown
    pub fn standard(clock: T) -> DetectionResult<Self> {
        Self::with_profiles(
            clock,
            &[DetectionProfile::variance_burst(), DetectionProfile::moving_average()],
            GLOBAL_COOLDOWN_MS,
        )
    }

    pub fn with_profiles(
        clock: T,
        profiles: &[DetectionProfile],
        global_cooldown_ms: u64,
    ) -> DetectionResult<Self> {
        let mut detector = Self::new(clock, global_cooldown_ms);
        for profile in profiles {
            detector.add_profile(*profile)?;
        }
        Ok(detector)
    }

    pub fn add_profile(&mut self, profile: DetectionProfile) -> DetectionResult<()> {
        let classifier = DetectionClassifier::new(profile)?;
        self.chains
            .push(classifier)
            .map_err(|_| DetectionError::TooManyProfiles { max: MAX_PROFILES })
    }

    /// Feeds one sample to every chain.
    ///
    /// `Ok(None)` covers both "nothing detected" and "window still filling".
    /// Non-finite samples are rejected before touching any window.
    pub fn ingest(&mut self, sample: &SensorSample) -> DetectionResult<Option<Detection>> {
        if !sample.is_finite() {
            return Err(DetectionError::InvalidSample);
        }

        let now = self.clock.now();
        let mut admitted = None;

        for chain in self.chains.iter_mut() {
            let Some(candidate) = chain.process(sample, now) else {
                continue;
            };

            if admitted.is_none() && self.dedup.try_emit(now) {
                admitted = Some(candidate);
            }
        }

        Ok(admitted.map(|candidate| {
            let id = EventId(self.next_id);
            self.next_id += 1;

            log_info!(
                "{} confirmed by {}: magnitude {:.2}, confidence {:.2}",
                id,
                candidate.profile.name(),
                candidate.magnitude,
                candidate.confidence
            );

            Detection {
                id,
                candidate,
                position: None,
            }
        }))
    }

    /// Discards in-flight classifier state (windows, hits). Emit times and
    /// the id sequence are kept.
    pub fn reset(&mut self) {
        for chain in self.chains.iter_mut() {
            chain.reset();
        }
    }

    pub fn classifiers(&self) -> impl Iterator<Item = &DetectionClassifier> {
        self.chains.iter()
    }

    pub fn profile_count(&self) -> usize {
        self.chains.len()
    }

    pub fn deduplicator(&self) -> &EventDeduplicator {
        &self.dedup
    }

    pub fn clock(&self) -> &T {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut T {
        &mut self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedTime;

    const STEP_MS: u64 = 20;

    fn feed(detector: &mut Detector<FixedTime>, z: f32) -> Option<Detection> {
        detector.clock_mut().advance(STEP_MS);
        let now = detector.clock().now();
        detector
            .ingest(&SensorSample::new(0.0, 0.0, z, now))
            .unwrap()
    }

    #[test]
    fn rejects_nan_sample() {
        let mut detector = Detector::standard(FixedTime::new(0)).unwrap();
        let result = detector.ingest(&SensorSample::new(f32::NAN, 0.0, 9.8, 0));
        assert_eq!(result, Err(DetectionError::InvalidSample));
    }

    #[test]
    fn profile_capacity() {
        let mut detector = Detector::new(FixedTime::new(0), GLOBAL_COOLDOWN_MS);
        for _ in 0..MAX_PROFILES {
            detector.add_profile(DetectionProfile::moving_average()).unwrap();
        }
        assert_eq!(
            detector.add_profile(DetectionProfile::moving_average()),
            Err(DetectionError::TooManyProfiles { max: MAX_PROFILES })
        );
    }

    #[test]
    fn invalid_profile_rejected() {
        let mut profile = DetectionProfile::variance_burst();
        profile.window_size = 0;
        assert!(Detector::with_profiles(FixedTime::new(0), &[profile], 1_000).is_err());
    }

    #[test]
    fn simultaneous_profiles_emit_once() {
        let mut detector = Detector::standard(FixedTime::new(0)).unwrap();
        let mut detections = 0;

        for i in 0..500 {
            let z = if i % 2 == 0 { 20.0 } else { 60.0 };
            if feed(&mut detector, z).is_some() {
                detections += 1;
            }
        }

        // 500 × 20 ms = 10 s, inside one global cooldown
        assert_eq!(detections, 1);
    }

    #[test]
    fn ids_are_sequential() {
        let mut detector =
            Detector::with_profiles(FixedTime::new(0), &[DetectionProfile::moving_average()], 0)
                .unwrap();

        let mut ids = std::vec::Vec::new();
        for _ in 0..10 {
            feed(&mut detector, 50.0);
        }
        for _ in 0..3 {
            // Past the profile cooldown
            detector.clock_mut().advance(DetectionProfile::moving_average().cooldown_ms);
            if let Some(detection) = feed(&mut detector, 50.0) {
                ids.push(detection.id);
            }
        }

        assert_eq!(ids, std::vec![EventId(2), EventId(3), EventId(4)]);
    }

    #[test]
    fn reset_keeps_cooldown() {
        let mut detector = Detector::standard(FixedTime::new(0)).unwrap();
        let mut first = None;
        for _ in 0..10 {
            first = first.or(feed(&mut detector, 50.0));
        }
        assert!(first.is_some());

        detector.reset();
        assert!(detector.classifiers().all(|c| !c.statistics().is_ready()));

        for _ in 0..10 {
            assert!(feed(&mut detector, 50.0).is_none());
        }
    }
}
