//! Target-space transforms for right-skewed regression targets.

/// Forward transform applied to targets at training time.
#[inline]
pub fn log1p_target(y: f64) -> f64 {
    y.ln_1p()
}

/// Inverse transform applied to raw model output.
#[inline]
pub fn expm1_inverse(z: f64) -> f64 {
    z.exp_m1()
}

/// Floor a prediction at zero. NaN maps to 0.0.
#[inline]
pub fn clip_non_negative(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}

/// Full post-processing: inverse transform, then clip at zero.
#[inline]
pub fn to_target_space(z: f64) -> f64 {
    clip_non_negative(expm1_inverse(z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_small_values() {
        for y in [0.0, 1.0, 12.5, 1.0e6] {
            let back = expm1_inverse(log1p_target(y));
            assert!((back - y).abs() <= 1e-9 * y.max(1.0));
        }
    }

    #[test]
    fn test_negative_log_space_clips_to_zero() {
        assert_eq!(to_target_space(-5.0), 0.0);
        assert_eq!(to_target_space(f64::NEG_INFINITY), 0.0);
        assert_eq!(clip_non_negative(f64::NAN), 0.0);
    }
}
