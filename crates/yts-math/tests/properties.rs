//! Property-based tests for yts-math statistics and transforms.

use proptest::prelude::*;
use yts_math::{
    clip_non_negative, mean, percentile_ranks, quantile, round_to, sample_std, to_target_space,
};

fn finite_vec(min_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e6..1.0e6f64, min_len..64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Post-processed predictions are never negative, whatever the model emits.
    #[test]
    fn target_space_is_non_negative(z in -1.0e3..50.0f64) {
        prop_assert!(to_target_space(z) >= 0.0);
        prop_assert!(clip_non_negative(z) >= 0.0);
    }

    /// The mean lies within [min, max].
    #[test]
    fn mean_is_bounded(v in finite_vec(1)) {
        let m = mean(&v);
        let lo = v.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(m >= lo - 1e-6 && m <= hi + 1e-6);
    }

    /// Shifting every value leaves the standard deviation unchanged.
    #[test]
    fn std_is_shift_invariant(v in prop::collection::vec(-1.0e3..1.0e3f64, 2..32), shift in -1.0e3..1.0e3f64) {
        let shifted: Vec<f64> = v.iter().map(|x| x + shift).collect();
        prop_assert!((sample_std(&v) - sample_std(&shifted)).abs() < 1e-6);
    }

    /// Quantiles are monotone in q.
    #[test]
    fn quantile_monotone(v in finite_vec(1), a in 0.0..1.0f64, b in 0.0..1.0f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(quantile(&v, lo) <= quantile(&v, hi) + 1e-9);
    }

    /// Percentile ranks are in (0, 1] and preserve value order.
    #[test]
    fn percentile_ranks_order_preserving(v in finite_vec(1)) {
        let r = percentile_ranks(&v);
        prop_assert_eq!(r.len(), v.len());
        for i in 0..v.len() {
            prop_assert!(r[i] > 0.0 && r[i] <= 1.0);
            for j in 0..v.len() {
                if v[i] < v[j] {
                    prop_assert!(r[i] < r[j]);
                }
                if v[i] == v[j] {
                    prop_assert_eq!(r[i], r[j]);
                }
            }
        }
    }

    /// Rounding moves a value by at most half a unit in the last place kept.
    #[test]
    fn rounding_error_bounded(x in -1.0e6..1.0e6f64) {
        prop_assert!((round_to(x, 6) - x).abs() <= 0.5e-6 + 1e-9);
    }
}
