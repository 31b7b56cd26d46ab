//! Per-profile classification state machine.
//!
//! ```text
//!            match (hits < required)
//!          ┌───────────┐
//!          ▼           │
//!  Idle ──match──→ Accumulating ──hits == required──→ Confirmed ──→ Idle
//!   ▲                  │                                (transient)
//!   └────miss──────────┘
//! ```
//!
//! A confirmation always returns to `Idle` with zero hits, whether or not a
//! candidate was emitted. A near-miss (magnitude below the reportable
//! minimum, or still inside the cooldown) is discarded, not retried.

use crate::errors::DetectionResult;
use crate::events::DetectionCandidate;
use crate::macros::log_debug;
use crate::sample::SensorSample;
use crate::stats::WindowedStatistics;
use crate::time::{elapsed_ms, Timestamp};

use super::estimators::{estimate_confidence, estimate_magnitude};
use super::profile::DetectionProfile;

/// Observable phase of a classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierPhase {
    Idle,
    Accumulating,
}

/// Mutable state owned by exactly one classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionState {
    pub consecutive_hits: u32,
    /// `None` until the first emitted candidate
    pub last_emit_at: Option<Timestamp>,
}

/// Classification chain for one [`DetectionProfile`]
#[derive(Debug, Clone)]
pub struct DetectionClassifier {
    profile: DetectionProfile,
    stats: WindowedStatistics,
    state: DetectionState,
}

impl DetectionClassifier {
    pub fn new(profile: DetectionProfile) -> DetectionResult<Self> {
        profile.validate()?;

        Ok(Self {
            stats: WindowedStatistics::new(profile.window_size, profile.filter)?,
            profile,
            state: DetectionState::default(),
        })
    }

    /// Runs one sample through the chain.
    ///
    /// Returns a candidate only when this sample completes a confirmation
    /// that clears the magnitude floor and the profile cooldown.
    pub fn process(&mut self, sample: &SensorSample, now: Timestamp) -> Option<DetectionCandidate> {
        let latest = self.stats.ingest(sample);

        let outcome = match self.profile.rule.evaluate(&self.stats, &latest) {
            Ok(outcome) => outcome,
            Err(_) => {
                // Window still filling
                self.state.consecutive_hits = 0;
                return None;
            }
        };

        if !outcome.matched {
            self.state.consecutive_hits = 0;
            return None;
        }

        self.state.consecutive_hits += 1;
        if self.state.consecutive_hits < self.profile.required_hits {
            return None;
        }

        self.state.consecutive_hits = 0;

        let magnitude = estimate_magnitude(
            outcome.amplitude,
            outcome.variance,
            self.profile.magnitude_scale,
        );

        if magnitude < self.profile.min_reportable_magnitude {
            log_debug!(
                "{}: confirmed pattern below reportable magnitude ({:.2})",
                self.profile.label.name(),
                magnitude
            );
            return None;
        }

        if !self.cooldown_elapsed(now) {
            log_debug!("{}: confirmed pattern inside cooldown", self.profile.label.name());
            return None;
        }

        self.state.last_emit_at = Some(now);

        let (amplitude_threshold, variance_threshold) = self.profile.rule.confidence_thresholds();
        Some(DetectionCandidate {
            profile: self.profile.label,
            magnitude,
            confidence: estimate_confidence(
                outcome.amplitude,
                outcome.variance,
                amplitude_threshold,
                variance_threshold,
            ),
            amplitude: outcome.amplitude,
            variance: outcome.variance,
            detected_at: now,
        })
    }

    pub fn phase(&self) -> ClassifierPhase {
        if self.state.consecutive_hits == 0 {
            ClassifierPhase::Idle
        } else {
            ClassifierPhase::Accumulating
        }
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    pub fn profile(&self) -> &DetectionProfile {
        &self.profile
    }

    pub fn statistics(&self) -> &WindowedStatistics {
        &self.stats
    }

    /// Drops window contents and accumulated hits; the emit time survives
    /// so a restart cannot bypass the cooldown
    pub fn reset(&mut self) {
        self.stats.reset();
        self.state.consecutive_hits = 0;
    }

    fn cooldown_elapsed(&self, now: Timestamp) -> bool {
        match self.state.last_emit_at {
            None => true,
            Some(last) => elapsed_ms(last, now) > self.profile.cooldown_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_INTERVAL_MS: u64 = 20;

    fn burst_sample(i: u64) -> SensorSample {
        let z = if i % 2 == 0 { 20.0 } else { 60.0 };
        SensorSample::new(0.0, 0.0, z, i * SAMPLE_INTERVAL_MS)
    }

    fn run(classifier: &mut DetectionClassifier, range: core::ops::Range<u64>) -> Vec<(u64, DetectionCandidate)> {
        range
            .filter_map(|i| {
                classifier
                    .process(&burst_sample(i), i * SAMPLE_INTERVAL_MS)
                    .map(|c| (i, c))
            })
            .collect()
    }

    #[test]
    fn confirms_after_required_hits() {
        let mut classifier = DetectionClassifier::new(DetectionProfile::variance_burst()).unwrap();

        // Window full at index 9, fifth hit at index 13
        for i in 0..13 {
            assert!(classifier.process(&burst_sample(i), i * SAMPLE_INTERVAL_MS).is_none());
        }
        assert_eq!(classifier.phase(), ClassifierPhase::Accumulating);
        assert_eq!(classifier.state().consecutive_hits, 4);

        let candidate = classifier
            .process(&burst_sample(13), 13 * SAMPLE_INTERVAL_MS)
            .unwrap();
        assert!(candidate.magnitude >= 3.0);
        assert!(candidate.confidence > 0.0 && candidate.confidence <= 1.0);
        assert_eq!(classifier.phase(), ClassifierPhase::Idle);
    }

    #[test]
    fn cooldown_suppresses_repeats() {
        let mut classifier = DetectionClassifier::new(DetectionProfile::variance_burst()).unwrap();
        let emitted = run(&mut classifier, 0..200);

        assert_eq!(emitted.len(), 1);
        assert_eq!(classifier.state().last_emit_at, Some(13 * SAMPLE_INTERVAL_MS));
    }

    #[test]
    fn miss_resets_hits() {
        let mut classifier = DetectionClassifier::new(DetectionProfile::variance_burst()).unwrap();
        run(&mut classifier, 0..12);
        assert!(classifier.state().consecutive_hits > 0);

        // Quiet reading below the amplitude threshold
        classifier.process(&SensorSample::new(0.0, 0.0, 9.8, 1_000), 1_000);
        assert_eq!(classifier.state().consecutive_hits, 0);
    }

    #[test]
    fn near_miss_discards_evidence() {
        let mut profile = DetectionProfile::variance_burst();
        profile.min_reportable_magnitude = 9.0;
        let mut classifier = DetectionClassifier::new(profile).unwrap();

        let emitted = run(&mut classifier, 0..14);
        assert!(emitted.is_empty());
        assert_eq!(classifier.state().consecutive_hits, 0);
        assert_eq!(classifier.state().last_emit_at, None);
    }

    #[test]
    fn moving_average_reports_estimated_magnitude() {
        let mut classifier = DetectionClassifier::new(DetectionProfile::moving_average()).unwrap();

        let candidate = run(&mut classifier, 0..10).pop().map(|(_, c)| c).unwrap();

        // Mean 40 m/s² is not the reported magnitude; the estimator is
        assert_eq!(candidate.amplitude, 40.0);
        assert_eq!(candidate.variance, 400.0);
        assert_eq!(candidate.magnitude, estimate_magnitude(40.0, 400.0, 1.5));
        assert!(candidate.magnitude < 10.0);
    }

    #[test]
    fn reset_keeps_emit_time() {
        let mut classifier = DetectionClassifier::new(DetectionProfile::variance_burst()).unwrap();
        run(&mut classifier, 0..20);
        classifier.reset();

        assert!(!classifier.statistics().is_ready());
        assert_eq!(classifier.state().consecutive_hits, 0);
        assert!(classifier.state().last_emit_at.is_some());
    }
}
