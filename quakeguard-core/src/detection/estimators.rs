//! Magnitude and confidence estimation.
//!
//! Both estimators are pure functions of the observed amplitude and window
//! variance. Outputs are always inside their documented bounds, including
//! for zero, negative, infinite and NaN inputs.

use crate::constants::detection::{AMPLITUDE_WEIGHT, MAX_MAGNITUDE, VARIANCE_WEIGHT};

/// `clamp(log10(0.7·amplitude + 0.3·variance) · scale, 0, 10)`
///
/// A blend that is not strictly positive has no logarithm and maps to 0.
pub fn estimate_magnitude(amplitude: f64, variance: f64, scale: f64) -> f64 {
    let blend = AMPLITUDE_WEIGHT * amplitude + VARIANCE_WEIGHT * variance;
    if !(blend > 0.0) {
        return 0.0;
    }

    bounded(libm::log10(blend) * scale, 0.0, MAX_MAGNITUDE)
}

/// `clamp(0.7·(a-aT)/aT + 0.3·(v-vT)/vT, 0, 1)`
///
/// A term whose threshold is not positive contributes nothing, which is how
/// rules without a variance threshold are scored.
pub fn estimate_confidence(
    amplitude: f64,
    variance: f64,
    amplitude_threshold: f64,
    variance_threshold: f64,
) -> f64 {
    let amplitude_term = relative_excess(amplitude, amplitude_threshold);
    let variance_term = relative_excess(variance, variance_threshold);

    bounded(
        AMPLITUDE_WEIGHT * amplitude_term + VARIANCE_WEIGHT * variance_term,
        0.0,
        1.0,
    )
}

fn relative_excess(value: f64, threshold: f64) -> f64 {
    if threshold > 0.0 {
        (value - threshold) / threshold
    } else {
        0.0
    }
}

/// Like `f64::clamp`, but NaN lands on the lower bound
fn bounded(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn magnitude_of_typical_burst() {
        // 0.7·20 + 0.3·25 = 21.5; log10(21.5)·1.5 ≈ 2.0
        let m = estimate_magnitude(20.0, 25.0, 1.5);
        assert!((m - 1.9985).abs() < 1e-3);
    }

    #[test]
    fn magnitude_saturates() {
        assert_eq!(estimate_magnitude(1e12, 1e12, 1.5), MAX_MAGNITUDE);
        assert_eq!(estimate_magnitude(f64::INFINITY, 0.0, 1.5), MAX_MAGNITUDE);
    }

    #[test]
    fn magnitude_floors_at_zero() {
        assert_eq!(estimate_magnitude(0.0, 0.0, 1.5), 0.0);
        assert_eq!(estimate_magnitude(-5.0, 1.0, 1.5), 0.0);
        // Blend below 1 gives a negative log
        assert_eq!(estimate_magnitude(0.5, 0.0, 1.5), 0.0);
        assert_eq!(estimate_magnitude(f64::NAN, 1.0, 1.5), 0.0);
    }

    #[test]
    fn confidence_at_threshold_is_zero() {
        assert_eq!(estimate_confidence(15.0, 5.0, 15.0, 5.0), 0.0);
    }

    #[test]
    fn confidence_blends_excess() {
        // 0.7·(30-15)/15 + 0.3·(7.5-5)/5 = 0.7 + 0.15
        let c = estimate_confidence(30.0, 7.5, 15.0, 5.0);
        assert!((c - 0.85).abs() < 1e-9);
    }

    #[test]
    fn confidence_ignores_unset_threshold() {
        // 0.7·(18-15)/15 = 0.14
        let c = estimate_confidence(18.0, 1_000.0, 15.0, 0.0);
        assert!((c - 0.14).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn magnitude_is_bounded(
            amplitude in prop::num::f64::ANY,
            variance in prop::num::f64::ANY,
            scale in 0.0f64..10.0,
        ) {
            let m = estimate_magnitude(amplitude, variance, scale);
            prop_assert!((0.0..=MAX_MAGNITUDE).contains(&m));
        }

        #[test]
        fn confidence_is_bounded(
            amplitude in prop::num::f64::ANY,
            variance in prop::num::f64::ANY,
            amplitude_threshold in prop::num::f64::ANY,
            variance_threshold in prop::num::f64::ANY,
        ) {
            let c = estimate_confidence(amplitude, variance, amplitude_threshold, variance_threshold);
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
