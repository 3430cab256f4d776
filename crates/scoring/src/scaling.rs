//! Logistic scaling of accumulated weights.
//!
//! `scale(v) = 2 / (1 + exp(-k v)) - 1` with `k = 3/18`, which maps any real
//! number into (-1, 1). Heavy activity on one repository saturates towards
//! 1 instead of dominating the similarity computations downstream.

use crate::valuation::WeightVector;

/// Steepness of the logistic curve
pub const LOGISTIC_PARAM: f64 = 3.0 / 18.0;

/// Largest `f64` strictly below 1.0
const MAX_MAGNITUDE: f64 = 1.0 - f64::EPSILON / 2.0;

/// Scale one accumulated weight into (-1, 1).
///
/// The logistic form above equals `tanh(k v / 2)`, which keeps full relative
/// precision near zero and is odd, so `scale(-v) == -scale(v)` holds exactly.
/// Very large inputs are capped one ulp below 1 to keep the interval open.
pub fn logistic_scale(value: f64) -> f64 {
    let magnitude = (LOGISTIC_PARAM * value.abs() / 2.0).tanh().min(MAX_MAGNITUDE);
    magnitude.copysign(value)
}

/// Scale each dimension of a summed weight vector independently
pub fn scale_vector(raw: WeightVector) -> WeightVector {
    raw.map(logistic_scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(value: f64) -> f64 {
        2.0 / (1.0 + (-LOGISTIC_PARAM * value).exp()) - 1.0
    }

    #[test]
    fn test_zero_maps_to_zero() {
        assert_eq!(logistic_scale(0.0), 0.0);
    }

    #[test]
    fn test_matches_the_logistic_formula() {
        for v in [-40.0, -6.0, -1.25, -0.5, 0.25, 1.0, 1.25, 3.0, 18.0, 40.0] {
            assert!(
                (logistic_scale(v) - naive(v)).abs() < 1e-12,
                "mismatch at {}",
                v
            );
        }
    }

    #[test]
    fn test_odd_symmetry() {
        for v in [0.1, 0.5, 1.0, 2.75, 10.0, 123.456, 1e6, f64::MAX] {
            assert_eq!(logistic_scale(-v), -logistic_scale(v));
        }
    }

    #[test]
    fn test_strictly_increasing() {
        let values: Vec<f64> = (-400..=400).map(|i| i as f64 * 0.25).collect();
        for pair in values.windows(2) {
            assert!(
                logistic_scale(pair[0]) < logistic_scale(pair[1]),
                "not increasing between {} and {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_tiny_inputs_keep_their_sign() {
        for v in [1e-20, 1e-300, f64::MIN_POSITIVE] {
            assert!(logistic_scale(v) > 0.0, "scale({}) lost its sign", v);
            assert!(logistic_scale(-v) < 0.0);
        }
        assert!(logistic_scale(0.0) < logistic_scale(1e-20));
        assert!(logistic_scale(1e-20) < logistic_scale(1e-16));
    }

    #[test]
    fn test_bounded_and_saturating() {
        assert!(logistic_scale(1000.0) > 0.999);
        assert!(logistic_scale(-1000.0) < -0.999);

        for v in [1e3, 1e10, 1e300, f64::MAX] {
            let s = logistic_scale(v);
            assert!(s > 0.0 && s < 1.0, "scale({}) = {}", v, s);
            assert!(logistic_scale(-v) > -1.0);
        }
    }

    #[test]
    fn test_scale_vector_scales_each_dimension() {
        let scaled = scale_vector(WeightVector::new(1.0, 0.5, 1.25));

        assert_eq!(scaled.specific_interest, logistic_scale(1.0));
        assert_eq!(scaled.general_interest, logistic_scale(0.5));
        assert_eq!(scaled.graph_score, logistic_scale(1.25));
    }
}
