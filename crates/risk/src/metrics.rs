//! Risk metrics over a log-return series.
//!
//! Every estimator is total: short or degenerate input yields `NaN` (or an
//! infinity where the ratio is unbounded) rather than an error.

use serde::{Deserialize, Serialize};
use spread_scan_core::RiskConfig;
use tracing::trace;

use crate::fractal::{fractal_dimension, hurst_exponent};
use crate::returns::ReturnSeries;
use crate::stats::{lower_quantile, mean, sample_std};

/// Tail probability for VaR and CVaR (95% confidence).
pub const VAR_TAIL: f64 = 0.05;

/// Samples per year for hourly data over a ten-day window.
pub const DEFAULT_ANNUALIZATION: f64 = 240.0;

/// Periods per year for Sharpe and Sortino under daily rate conventions.
pub const DEFAULT_SHARPE_PERIODS: f64 = 252.0;

/// A denominator this small relative to its numerator is rounding noise.
const NOISE_TOLERANCE: f64 = 1e-9;

/// Fixed set of risk figures for one return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetricsResult {
    /// Annualised sample standard deviation of returns.
    pub volatility: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// 95% historical value-at-risk (a log-return, usually negative).
    pub var: f64,
    /// Mean of returns at or below `var`.
    pub cvar: f64,
    /// Largest peak-to-trough decline as a positive fraction.
    pub max_drawdown: f64,
    pub calmar: f64,
    pub omega: f64,
    pub hurst_exponent: f64,
    pub fractal_dimension: f64,
}

impl RiskMetricsResult {
    /// All fields `NaN`.
    #[must_use]
    pub const fn undefined() -> Self {
        Self {
            volatility: f64::NAN,
            sharpe: f64::NAN,
            sortino: f64::NAN,
            var: f64::NAN,
            cvar: f64::NAN,
            max_drawdown: f64::NAN,
            calmar: f64::NAN,
            omega: f64::NAN,
            hurst_exponent: f64::NAN,
            fractal_dimension: f64::NAN,
        }
    }

    /// Returns true if every field is `NaN`.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_nan())
    }

    /// Field names paired with values, in display order.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, f64); 10] {
        [
            ("volatility", self.volatility),
            ("sharpe", self.sharpe),
            ("sortino", self.sortino),
            ("var", self.var),
            ("cvar", self.cvar),
            ("max_drawdown", self.max_drawdown),
            ("calmar", self.calmar),
            ("omega", self.omega),
            ("hurst_exponent", self.hurst_exponent),
            ("fractal_dimension", self.fractal_dimension),
        ]
    }
}

impl Default for RiskMetricsResult {
    fn default() -> Self {
        Self::undefined()
    }
}

/// Estimator conventions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskMetricsEngine {
    /// Annual risk-free rate; divided by `sharpe_periods` per sample.
    pub risk_free_rate: f64,
    pub annualization_factor: f64,
    pub sharpe_periods: f64,
    pub omega_target: f64,
}

impl Default for RiskMetricsEngine {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            annualization_factor: DEFAULT_ANNUALIZATION,
            sharpe_periods: DEFAULT_SHARPE_PERIODS,
            omega_target: 0.0,
        }
    }
}

impl From<&RiskConfig> for RiskMetricsEngine {
    fn from(config: &RiskConfig) -> Self {
        Self {
            risk_free_rate: config.risk_free_rate,
            annualization_factor: config.annualization_factor,
            sharpe_periods: config.sharpe_periods,
            omega_target: config.omega_target,
        }
    }
}

impl RiskMetricsEngine {
    #[must_use]
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    #[must_use]
    pub fn with_annualization_factor(mut self, factor: f64) -> Self {
        self.annualization_factor = factor;
        self
    }

    /// Computes every metric for `series`. Fewer than two returns yields
    /// [`RiskMetricsResult::undefined`].
    #[must_use]
    pub fn compute(&self, series: &ReturnSeries) -> RiskMetricsResult {
        let r = series.as_slice();
        if r.len() < 2 || r.iter().any(|v| !v.is_finite()) {
            trace!(samples = r.len(), "Return series too short for risk metrics");
            return RiskMetricsResult::undefined();
        }

        let path = series.price_path();
        let mu = mean(r);
        let sd = dispersion(r, mu);
        let excess = mu - self.risk_free_rate / self.sharpe_periods;
        let var = lower_quantile(r, VAR_TAIL);
        let max_drawdown = max_drawdown(&path);

        RiskMetricsResult {
            volatility: sd * self.annualization_factor.sqrt(),
            sharpe: ratio(excess, sd) * self.sharpe_periods.sqrt(),
            sortino: self.sortino(r, excess),
            var,
            cvar: mean(&r.iter().copied().filter(|v| *v <= var).collect::<Vec<_>>()),
            max_drawdown,
            calmar: ratio(mu * self.annualization_factor, max_drawdown.abs()),
            omega: omega(r, self.omega_target),
            hurst_exponent: hurst_exponent(r),
            fractal_dimension: fractal_dimension(&path),
        }
    }

    fn sortino(&self, r: &[f64], excess: f64) -> f64 {
        let downside: Vec<f64> = r.iter().copied().filter(|v| *v < 0.0).collect();
        if downside.is_empty() {
            return f64::INFINITY;
        }
        let downside_mean = mean(&downside);
        ratio(excess, dispersion(&downside, downside_mean)) * self.sharpe_periods.sqrt()
    }
}

/// Computes metrics with default Sharpe periods and omega target.
#[must_use]
pub fn compute(
    series: &ReturnSeries,
    risk_free_rate: f64,
    annualization_factor: f64,
) -> RiskMetricsResult {
    RiskMetricsEngine::default()
        .with_risk_free_rate(risk_free_rate)
        .with_annualization_factor(annualization_factor)
        .compute(series)
}

/// Largest `(peak - trough) / peak` with the peak preceding the trough.
#[must_use]
pub fn max_drawdown(path: &[f64]) -> f64 {
    let Some(&first) = path.first() else {
        return f64::NAN;
    };
    let mut peak = first;
    let mut worst = 0.0_f64;
    for &p in path {
        if p > peak {
            peak = p;
        }
        if peak > 0.0 {
            worst = worst.max((peak - p) / peak);
        }
    }
    worst
}

/// Gain-to-loss ratio around `target`; no losses gives `+inf`.
#[must_use]
pub fn omega(returns: &[f64], target: f64) -> f64 {
    if returns.is_empty() {
        return f64::NAN;
    }
    let gains: f64 = returns.iter().map(|r| (r - target).max(0.0)).sum();
    let losses: f64 = returns.iter().map(|r| (target - r).max(0.0)).sum();
    if losses == 0.0 {
        return f64::INFINITY;
    }
    gains / losses
}

/// Sample standard deviation, snapped to zero when it is only the rounding
/// residue of a constant series with mean `mu`.
fn dispersion(values: &[f64], mu: f64) -> f64 {
    let sd = sample_std(values);
    if sd <= NOISE_TOLERANCE * mu.abs() {
        0.0
    } else {
        sd
    }
}

/// `NaN` when the denominator is zero, undefined, or negligible next to the
/// numerator.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.is_nan() || denominator.abs() <= NOISE_TOLERANCE * numerator.abs() {
        f64::NAN
    } else {
        numerator / denominator
    }
}
