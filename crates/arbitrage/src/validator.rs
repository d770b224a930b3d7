//! Stage 2: risk validation.
//!
//! A candidate survives only if the symbol's recent return history on both
//! the buy and the sell exchange passes every per-leg threshold, and its
//! profit clears the reward/risk floor against the mean volatility of the two
//! legs. Failing candidates are dropped, never flagged.

use serde::{Deserialize, Serialize};
use spread_scan_core::{PriceSnapshot, RiskConfig};
use spread_scan_risk::{ReturnSeries, RiskMetricsEngine, RiskMetricsResult};
use tracing::{debug, trace};

use crate::types::{SpreadCandidate, ValidatedCandidate};

// =============================================================================
// Thresholds
// =============================================================================

/// Limits applied to risk metrics. `None` disables a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub min_sharpe: Option<f64>,
    pub max_volatility: Option<f64>,
    pub min_reward_risk: Option<f64>,
    /// Positive fraction, e.g. `0.6` for a 60% drawdown.
    pub max_drawdown: Option<f64>,
    /// Floor on the 95% VaR log-return.
    pub min_var: Option<f64>,
    /// Reject when a checked metric is `NaN` instead of skipping the check.
    pub reject_undefined: bool,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self::from(&RiskConfig::default())
    }
}

impl From<&RiskConfig> for RiskThresholds {
    fn from(config: &RiskConfig) -> Self {
        Self {
            min_sharpe: config.min_sharpe,
            max_volatility: config.max_volatility,
            min_reward_risk: config.min_reward_risk,
            max_drawdown: config.max_drawdown,
            min_var: config.min_var,
            reject_undefined: config.reject_undefined,
        }
    }
}

impl RiskThresholds {
    /// No checks at all.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            min_sharpe: None,
            max_volatility: None,
            min_reward_risk: None,
            max_drawdown: None,
            min_var: None,
            reject_undefined: false,
        }
    }

    #[must_use]
    pub fn with_min_sharpe(mut self, v: f64) -> Self {
        self.min_sharpe = Some(v);
        self
    }

    #[must_use]
    pub fn with_max_volatility(mut self, v: f64) -> Self {
        self.max_volatility = Some(v);
        self
    }

    #[must_use]
    pub fn with_min_reward_risk(mut self, v: f64) -> Self {
        self.min_reward_risk = Some(v);
        self
    }

    #[must_use]
    pub fn with_reject_undefined(mut self, reject: bool) -> Self {
        self.reject_undefined = reject;
        self
    }
}

// =============================================================================
// Validation
// =============================================================================

/// `profit_pct / volatility`; `+inf` at zero volatility, `NaN` if undefined.
#[must_use]
pub fn reward_risk_ratio(profit_pct: f64, volatility: f64) -> f64 {
    if volatility.is_nan() || profit_pct.is_nan() {
        f64::NAN
    } else if volatility == 0.0 {
        f64::INFINITY
    } else {
        profit_pct / volatility
    }
}

/// Applies `thresholds` to the metrics of both legs of `candidate`.
///
/// Sharpe, volatility, drawdown and VaR limits are checked on each leg
/// separately. Reward/risk is `profit_pct` over the mean of the two legs'
/// volatilities. Returns a new [`ValidatedCandidate`] carrying both metric
/// sets and the ratio, or `None` if any enabled check fails.
#[must_use]
pub fn validate(
    candidate: &SpreadCandidate,
    buy: &RiskMetricsResult,
    sell: &RiskMetricsResult,
    thresholds: &RiskThresholds,
) -> Option<ValidatedCandidate> {
    if !leg_passes(candidate, "buy", buy, thresholds)
        || !leg_passes(candidate, "sell", sell, thresholds)
    {
        return None;
    }

    let volatility = (buy.volatility + sell.volatility) / 2.0;
    let reward_risk = reward_risk_ratio(candidate.profit_pct_f64(), volatility);
    let floor = thresholds.min_reward_risk;
    if !passes(candidate, "pair", "reward_risk", reward_risk, floor, Bound::Min, thresholds) {
        return None;
    }

    let mut annotated = candidate.clone();
    annotated.reward_risk_ratio = (!reward_risk.is_nan()).then_some(reward_risk);
    Some(ValidatedCandidate {
        candidate: annotated,
        buy_metrics: *buy,
        sell_metrics: *sell,
    })
}

fn leg_passes(
    candidate: &SpreadCandidate,
    leg: &str,
    metrics: &RiskMetricsResult,
    thresholds: &RiskThresholds,
) -> bool {
    let checks = [
        ("sharpe", metrics.sharpe, thresholds.min_sharpe, Bound::Min),
        ("volatility", metrics.volatility, thresholds.max_volatility, Bound::Max),
        ("max_drawdown", metrics.max_drawdown, thresholds.max_drawdown, Bound::Max),
        ("var", metrics.var, thresholds.min_var, Bound::Min),
    ];

    checks.into_iter().all(|(name, value, limit, bound)| {
        passes(candidate, leg, name, value, limit, bound, thresholds)
    })
}

/// One threshold check. A disabled limit always passes; an undefined value
/// passes unless `reject_undefined` is set.
fn passes(
    candidate: &SpreadCandidate,
    leg: &str,
    metric: &str,
    value: f64,
    limit: Option<f64>,
    bound: Bound,
    thresholds: &RiskThresholds,
) -> bool {
    let Some(limit) = limit else { return true };
    if value.is_nan() {
        if thresholds.reject_undefined {
            trace!(symbol = %candidate.symbol, leg, metric, "Metric undefined, rejecting");
            return false;
        }
        return true;
    }
    let ok = match bound {
        Bound::Min => value >= limit,
        Bound::Max => value <= limit,
    };
    if !ok {
        debug!(
            symbol = %candidate.symbol,
            buy = %candidate.buy_exchange,
            sell = %candidate.sell_exchange,
            leg,
            metric,
            value,
            limit,
            "Candidate failed risk threshold"
        );
    }
    ok
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Min,
    Max,
}

/// Stage-2 validator holding thresholds and estimator conventions.
#[derive(Debug, Clone, Default)]
pub struct RiskValidator {
    thresholds: RiskThresholds,
    engine: RiskMetricsEngine,
}

impl From<&RiskConfig> for RiskValidator {
    fn from(config: &RiskConfig) -> Self {
        Self::new(RiskThresholds::from(config), RiskMetricsEngine::from(config))
    }
}

impl RiskValidator {
    #[must_use]
    pub fn new(thresholds: RiskThresholds, engine: RiskMetricsEngine) -> Self {
        Self { thresholds, engine }
    }

    /// Metrics for a price history, all `NaN` if the history is unusable.
    #[must_use]
    pub fn metrics_for(&self, history: &[PriceSnapshot]) -> RiskMetricsResult {
        match ReturnSeries::from_snapshots(history) {
            Ok(series) => self.engine.compute(&series),
            Err(e) => {
                trace!(error = %e, "Unusable history, metrics undefined");
                RiskMetricsResult::undefined()
            }
        }
    }

    /// Validates `candidate` against already computed metrics of both legs.
    #[must_use]
    pub fn validate(
        &self,
        candidate: &SpreadCandidate,
        buy: &RiskMetricsResult,
        sell: &RiskMetricsResult,
    ) -> Option<ValidatedCandidate> {
        validate(candidate, buy, sell, &self.thresholds)
    }
}
