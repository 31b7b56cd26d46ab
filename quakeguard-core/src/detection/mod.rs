//! Seismic detection: estimators, profiles, classifiers and deduplication.
//!
//! [`Detector`] is the entry point. It owns one [`DetectionClassifier`] per
//! [`DetectionProfile`] and a shared [`EventDeduplicator`].

pub mod classifier;
pub mod dedup;
pub mod detector;
pub mod estimators;
pub mod profile;

pub use classifier::{ClassifierPhase, DetectionClassifier, DetectionState};
pub use dedup::EventDeduplicator;
pub use detector::Detector;
pub use estimators::{estimate_confidence, estimate_magnitude};
pub use profile::{ClassificationRule, DetectionProfile, RuleOutcome};
