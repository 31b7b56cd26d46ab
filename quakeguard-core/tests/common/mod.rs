//! Shared sample generators for detection integration tests
//!
//! - `TestRng`: tiny deterministic xorshift, no external seed state
//! - `SampleStream`: timestamped accelerometer samples at a fixed rate
//! - Canned motion patterns: rest, noise, bursts, gated bursts

#![allow(dead_code)]

use quakeguard_core::{
    time::{FixedTime, TimeSource, Timestamp},
    Detection, Detector, SensorSample,
};

/// 50 Hz, a typical handset accelerometer rate
pub const SAMPLE_INTERVAL_MS: u64 = 20;

pub const GRAVITY: f32 = 9.8;

/// Deterministic xorshift generator
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16777216.0
    }

    pub fn gen_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }
}

/// Vertical-axis sample: the norm equals `|z|`
pub fn vertical(z: f32, observed_at: Timestamp) -> SensorSample {
    SensorSample::new(0.0, 0.0, z, observed_at)
}

/// Alternating 20 / 60 m/s²: every full window has variance 400
pub fn burst_pattern(len: usize) -> Vec<f32> {
    (0..len).map(|i| if i % 2 == 0 { 20.0 } else { 60.0 }).collect()
}

/// Four strong readings then one quiet one, repeated.
///
/// The long-run average is ~49 m/s² but no run of hits is longer than four.
pub fn gated_burst_pattern(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| match i % 5 {
            4 => 5.0,
            n if n % 2 == 0 => 30.0,
            _ => 90.0,
        })
        .collect()
}

/// Handset at rest with small sensor noise
pub fn rest_pattern(len: usize, rng: &mut TestRng) -> Vec<f32> {
    (0..len).map(|_| GRAVITY + rng.gen_range(-0.05, 0.05)).collect()
}

/// Feeds `magnitudes` one per sample interval, advancing the detector
/// clock, and returns every detection with the index that produced it
pub fn drive(detector: &mut Detector<FixedTime>, magnitudes: &[f32]) -> Vec<(usize, Detection)> {
    let mut detections = Vec::new();

    for (i, z) in magnitudes.iter().enumerate() {
        detector.clock_mut().advance(SAMPLE_INTERVAL_MS);
        let now = detector.clock().now();

        if let Some(detection) = detector
            .ingest(&vertical(*z, now))
            .expect("finite sample")
        {
            detections.push((i, detection));
        }
    }

    detections
}
