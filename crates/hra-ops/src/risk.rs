//! Scalar risk arithmetic shared by the raster operations.

use hra_core::RiskEquation;

/// Highest risk and recovery class.
pub const MAX_RISK_CLASS: f64 = 3.0;

/// Pairwise risk from exposure `e` and consequence `c`.
///
/// Zero whenever either score is exactly zero (no realized overlap).
pub fn pair_risk(e: f64, c: f64, equation: RiskEquation) -> f64 {
    if e == 0.0 || c == 0.0 {
        return 0.0;
    }
    match equation {
        RiskEquation::Multiplicative => e * c,
        RiskEquation::Euclidean => {
            let de = (e - 1.0).max(0.0);
            let dc = (c - 1.0).max(0.0);
            (de * de + dc * dc).sqrt()
        }
    }
}

/// Largest total risk a habitat pixel can reach when `max_overlap`
/// stressors coincide.
pub fn max_risk_score(max_overlap: f64, max_rating: f64, equation: RiskEquation) -> f64 {
    match equation {
        RiskEquation::Multiplicative => max_overlap * max_rating * max_rating,
        RiskEquation::Euclidean => {
            let d = max_rating - 1.0;
            max_overlap * (2.0 * d * d).sqrt()
        }
    }
}

/// Class `ceil(risk / (max_score / 3))`, clamped to `[0, 3]`.
///
/// A non-positive `max_score` means no stressor reaches any habitat;
/// every pixel is class 0.
pub fn reclassify(risk: f64, max_score: f64) -> f64 {
    if max_score <= 0.0 {
        return 0.0;
    }
    (risk / (max_score / MAX_RISK_CLASS))
        .ceil()
        .clamp(0.0, MAX_RISK_CLASS)
}

/// Recovery class `ceil(3 * (1 - num/denom/max_rating))`, clamped to
/// `[0, 3]`.
pub fn recovery_class(numerator: f64, denominator: f64, max_rating: f64) -> f64 {
    let score = numerator / denominator;
    (MAX_RISK_CLASS - score / max_rating * MAX_RISK_CLASS)
        .ceil()
        .clamp(0.0, MAX_RISK_CLASS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn euclidean_reference_values() {
        assert_eq!(pair_risk(1.0, 1.0, RiskEquation::Euclidean), 0.0);
        assert_eq!(pair_risk(3.0, 1.0, RiskEquation::Euclidean), 2.0);
        assert_eq!(pair_risk(3.0, 3.0, RiskEquation::Euclidean), 8f64.sqrt());
    }

    #[test]
    fn multiplicative_reference_values() {
        assert_eq!(pair_risk(2.0, 3.0, RiskEquation::Multiplicative), 6.0);
        assert_eq!(max_risk_score(1.0, 3.0, RiskEquation::Multiplicative), 9.0);
        assert_eq!(reclassify(6.0, 9.0), 2.0);
    }

    #[test]
    fn euclidean_max_score() {
        assert_eq!(max_risk_score(2.0, 3.0, RiskEquation::Euclidean), 2.0 * 8f64.sqrt());
    }

    #[test]
    fn zero_max_score_is_class_zero() {
        assert_eq!(reclassify(5.0, 0.0), 0.0);
    }

    #[test]
    fn recovery_classes() {
        // Rating 3 of 3: fully resilient.
        assert_eq!(recovery_class(3.0, 1.0, 3.0), 0.0);
        // Rating 1 of 3: ceil(3 - 1) = 2.
        assert_eq!(recovery_class(1.0, 1.0, 3.0), 2.0);
        assert_eq!(recovery_class(2.0, 1.0, 3.0), 1.0);
    }

    proptest! {
        #[test]
        fn zero_score_means_zero_risk(x in 0.0f64..10.0) {
            for eq in [RiskEquation::Euclidean, RiskEquation::Multiplicative] {
                prop_assert_eq!(pair_risk(0.0, x, eq), 0.0);
                prop_assert_eq!(pair_risk(x, 0.0, eq), 0.0);
            }
        }

        #[test]
        fn reclassify_monotone(max in 0.1f64..100.0, a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(reclassify(lo * max, max) <= reclassify(hi * max, max));
        }

        #[test]
        fn reclassify_saturates_at_max(max in 0.1f64..1000.0) {
            prop_assert_eq!(reclassify(max, max), MAX_RISK_CLASS);
            prop_assert_eq!(reclassify(max * 4.0, max), MAX_RISK_CLASS);
        }

        #[test]
        fn risk_never_exceeds_single_pair_max(
            e in 1.0f64..=3.0,
            c in 1.0f64..=3.0,
        ) {
            for eq in [RiskEquation::Euclidean, RiskEquation::Multiplicative] {
                prop_assert!(pair_risk(e, c, eq) <= max_risk_score(1.0, 3.0, eq) + 1e-9);
            }
        }
    }
}
