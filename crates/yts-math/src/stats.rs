//! Descriptive statistics with pandas-compatible conventions.
//!
//! - standard deviation is the sample estimate (n - 1 denominator)
//! - quantiles interpolate linearly between order statistics
//! - percentile ranks average tied positions

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Arithmetic mean. Returns NaN for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
///
/// Returns NaN for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (n as f64 - 1.0)).sqrt()
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Linear-interpolated quantile of already-sorted data, `q` in [0, 1].
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] + frac * (sorted[hi] - sorted[lo])
    }
}

/// Linear-interpolated quantile of unsorted data.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    quantile_sorted(&sorted_copy(values), q)
}

/// Fractional percentile rank of every value, ties averaged.
///
/// Output is in input order; each entry is `average_rank / n` with ranks
/// starting at 1, so the largest distinct value ranks 1.0.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // positions start..=end share the average of ranks start+1..=end+1
        let avg = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = avg / n as f64;
        }
        start = end + 1;
    }
    ranks
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Count/mean/std/min/max of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// Summarize `values`; undefined statistics (empty input, single value
    /// std) are reported as 0.0 so the result is always JSON-representable.
    pub fn of(values: &[f64]) -> Self {
        let finite_or_zero = |v: f64| if v.is_finite() { v } else { 0.0 };
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Self {
            count: values.len(),
            mean: finite_or_zero(mean(values)),
            std: finite_or_zero(sample_std(values)),
            min: finite_or_zero(min),
            max: finite_or_zero(max),
        }
    }

    /// Same summary with every statistic rounded to `decimals`.
    pub fn rounded(self, decimals: i32) -> Self {
        Self {
            count: self.count,
            mean: round_to(self.mean, decimals),
            std: round_to(self.std, decimals),
            min: round_to(self.min, decimals),
            max: round_to(self.max, decimals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < TOL);
        // sample std of this classic set is sqrt(32/7)
        assert!((sample_std(&v) - (32.0f64 / 7.0).sqrt()).abs() < TOL);
    }

    #[test]
    fn test_std_undefined_for_single_value() {
        assert!(sample_std(&[3.0]).is_nan());
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_quantile_linear() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&v, 0.5) - 2.5).abs() < TOL);
        assert!((quantile(&v, 0.95) - 3.85).abs() < 1e-9);
        assert!((quantile(&v, 0.0) - 1.0).abs() < TOL);
        assert!((quantile(&v, 1.0) - 4.0).abs() < TOL);
    }

    #[test]
    fn test_quantile_unsorted_input() {
        let v = [10.0, 0.0, 5.0];
        assert!((quantile(&v, 0.5) - 5.0).abs() < TOL);
    }

    #[test]
    fn test_percentile_ranks_with_ties() {
        let ranks = percentile_ranks(&[10.0, 20.0, 20.0, 40.0]);
        assert!((ranks[0] - 0.25).abs() < TOL);
        assert!((ranks[1] - 0.625).abs() < TOL);
        assert!((ranks[2] - 0.625).abs() < TOL);
        assert!((ranks[3] - 1.0).abs() < TOL);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.1234567, 6), 0.123457);
        assert_eq!(round_to(2.0 / 3.0, 3), 0.667);
    }

    #[test]
    fn test_summary_empty_is_zeroes() {
        let s = Summary::of(&[]);
        assert_eq!(s.count, 0);
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.min, 0.0);
    }

    #[test]
    fn test_summary_rounded() {
        let s = Summary::of(&[1.0, 2.0, 4.0]).rounded(3);
        assert_eq!(s.count, 3);
        assert_eq!(s.mean, 2.333);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
    }
}
