//! Small descriptive-statistics helpers over `f64` slices.
//!
//! Every function returns `NaN` when the input is too short to define the
//! statistic instead of panicking.

/// Arithmetic mean.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

/// Sample standard deviation (Bessel-corrected, `n - 1` denominator).
#[must_use]
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    #[allow(clippy::cast_precision_loss)]
    let denom = (values.len() - 1) as f64;
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / denom).sqrt()
}

/// Population standard deviation (`n` denominator).
#[must_use]
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n).sqrt()
}

/// Empirical lower quantile using the nearest-rank rule.
///
/// Returns the smallest observation `v` such that at least `q` of the sample
/// is `<= v`. `q` is clamped to `[0, 1]`.
#[must_use]
pub fn lower_quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() || q.is_nan() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let rank = (q.clamp(0.0, 1.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Ordinary least-squares slope of `y` on `x`.
///
/// Returns `NaN` for fewer than two points, mismatched lengths, or a
/// degenerate `x`.
#[must_use]
pub fn ols_slope(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return f64::NAN;
    }
    let mx = mean(x);
    let my = mean(y);
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        sxy += (xi - mx) * (yi - my);
        sxx += (xi - mx).powi(2);
    }
    if sxx == 0.0 {
        return f64::NAN;
    }
    sxy / sxx
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < EPS);
        assert!((population_std(&v) - 2.0).abs() < EPS);
        assert!((sample_std(&v) - (32.0_f64 / 7.0).sqrt()).abs() < EPS);
    }

    #[test]
    fn test_short_inputs_are_nan() {
        assert!(mean(&[]).is_nan());
        assert!(sample_std(&[1.0]).is_nan());
        assert!(population_std(&[]).is_nan());
        assert!(lower_quantile(&[], 0.05).is_nan());
        assert!(ols_slope(&[1.0], &[1.0]).is_nan());
    }

    #[test]
    fn test_lower_quantile_nearest_rank() {
        let v: Vec<f64> = (1..=100).map(f64::from).rev().collect();
        assert!((lower_quantile(&v, 0.05) - 5.0).abs() < EPS);
        assert!((lower_quantile(&v, 0.0) - 1.0).abs() < EPS);
        assert!((lower_quantile(&v, 1.0) - 100.0).abs() < EPS);

        // 5% of 10 rounds up to the first observation.
        let small = [3.0, 1.0, 2.0, 5.0, 4.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert!((lower_quantile(&small, 0.05) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_ols_slope() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        assert!((ols_slope(&x, &y) - 2.0).abs() < EPS);
        assert!(ols_slope(&[1.0, 1.0], &[2.0, 3.0]).is_nan());
    }
}
