//! Long-memory and roughness estimators: rescaled-range Hurst exponent and
//! box-counting fractal dimension.

use crate::stats::{mean, ols_slope, population_std};

/// Smallest sub-window used in rescaled-range analysis.
pub const MIN_RS_WINDOW: usize = 8;

/// Coarsest grid used in box counting.
pub const MIN_BOX_SCALE: usize = 2;

/// Hurst exponent by rescaled-range (R/S) analysis over log-returns.
///
/// Window sizes double from [`MIN_RS_WINDOW`] while at least two
/// non-overlapping windows fit. Windows with zero dispersion are skipped.
/// Returns `NaN` if fewer than two window sizes produce a usable R/S value.
#[must_use]
pub fn hurst_exponent(returns: &[f64]) -> f64 {
    let mut log_sizes = Vec::new();
    let mut log_rs = Vec::new();

    let mut size = MIN_RS_WINDOW;
    while size * 2 <= returns.len() {
        let ratios: Vec<f64> = returns
            .chunks_exact(size)
            .filter_map(rescaled_range)
            .collect();
        if !ratios.is_empty() {
            let avg = mean(&ratios);
            if avg > 0.0 {
                #[allow(clippy::cast_precision_loss)]
                log_sizes.push((size as f64).ln());
                log_rs.push(avg.ln());
            }
        }
        size *= 2;
    }

    if log_sizes.len() < 2 {
        return f64::NAN;
    }
    ols_slope(&log_sizes, &log_rs)
}

fn rescaled_range(chunk: &[f64]) -> Option<f64> {
    let s = population_std(chunk);
    if s.is_nan() || s <= 0.0 {
        return None;
    }
    let m = mean(chunk);
    let mut cumulative = 0.0_f64;
    let (mut lo, mut hi) = (0.0_f64, 0.0_f64);
    for v in chunk {
        cumulative += v - m;
        lo = lo.min(cumulative);
        hi = hi.max(cumulative);
    }
    Some((hi - lo) / s)
}

/// Box-counting dimension of a price path.
///
/// The path is mapped onto the unit square (time on x, min-max scaled price
/// on y) and covered with `m x m` grids for `m = 2, 4, 8, ...` up to one box
/// per step. In each column the path is continuous, so the boxes counted are
/// every row between the lowest and highest price touched in that column,
/// including the first point of the next column. `D` is the slope of
/// `ln(count)` against `ln(m)`.
///
/// A flat path has dimension 1. Returns `NaN` when fewer than two scales fit.
#[must_use]
pub fn fractal_dimension(path: &[f64]) -> f64 {
    let n = path.len();
    if n < 2 || path.iter().any(|p| !p.is_finite()) {
        return f64::NAN;
    }

    let lo = path.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = path.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let steps = n - 1;
    let scales: Vec<usize> = std::iter::successors(Some(MIN_BOX_SCALE), |m| Some(m * 2))
        .take_while(|m| *m <= steps)
        .collect();
    if scales.len() < 2 {
        return f64::NAN;
    }
    if hi - lo <= 0.0 {
        return 1.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let xs: Vec<f64> = (0..n).map(|i| i as f64 / steps as f64).collect();
    let ys: Vec<f64> = path.iter().map(|p| (p - lo) / (hi - lo)).collect();

    let mut log_scales = Vec::with_capacity(scales.len());
    let mut log_counts = Vec::with_capacity(scales.len());
    for m in scales {
        let count = box_count(&xs, &ys, m);
        #[allow(clippy::cast_precision_loss)]
        {
            log_scales.push((m as f64).ln());
            log_counts.push((count as f64).ln());
        }
    }

    ols_slope(&log_scales, &log_counts)
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn box_count(xs: &[f64], ys: &[f64], m: usize) -> usize {
    let mf = m as f64;
    let column = |x: f64| ((x * mf).floor() as usize).min(m - 1);

    let mut ranges: Vec<Option<(f64, f64)>> = vec![None; m];
    let mut extend = |c: usize, y: f64| {
        let slot = &mut ranges[c];
        *slot = Some(match *slot {
            Some((a, b)) => (a.min(y), b.max(y)),
            None => (y, y),
        });
    };

    for i in 0..xs.len() {
        let c = column(xs[i]);
        extend(c, ys[i]);
        if let Some(&next_x) = xs.get(i + 1) {
            let next = column(next_x);
            if next != c {
                extend(c, ys[i + 1]);
            }
        }
    }

    ranges
        .into_iter()
        .flatten()
        .map(|(a, b)| {
            let first = ((a * mf).floor() as usize).min(m - 1);
            let last = ((b * mf).ceil() as usize).clamp(first + 1, m);
            last - first
        })
        .sum()
}
