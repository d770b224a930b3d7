//! Candidate records passed between pipeline stages.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spread_scan_core::ExchangeId;
use spread_scan_risk::RiskMetricsResult;
use std::cmp::Ordering;

// =============================================================================
// Spread Candidate
// =============================================================================

/// A buy-low / sell-high pair for one symbol across two exchanges.
///
/// `buy_exchange != sell_exchange` and `profit == revenue - cost` hold for
/// every candidate produced by the spread calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadCandidate {
    pub symbol: String,
    pub buy_exchange: ExchangeId,
    pub sell_exchange: ExchangeId,
    /// Best ask on the buy exchange.
    pub buy_price: Decimal,
    /// Best bid on the sell exchange.
    pub sell_price: Decimal,
    /// Executable volume after the trade-size cap.
    pub volume: Decimal,
    /// Buy notional including the buy-leg fee.
    pub cost: Decimal,
    /// Sell notional net of the sell-leg fee.
    pub revenue: Decimal,
    pub profit: Decimal,
    /// `profit / cost * 100`.
    pub profit_pct: Decimal,
    /// `profit_pct` over the mean volatility of both legs; unset until risk
    /// validation.
    pub reward_risk_ratio: Option<f64>,
    /// Executable volume before the trade-size cap. Top-of-book size from
    /// stage 1, replaced by order-book depth once books are fetched.
    pub depth: Decimal,
}

impl SpreadCandidate {
    /// Profit percentage as `f64`, for ratios against statistical metrics.
    #[must_use]
    pub fn profit_pct_f64(&self) -> f64 {
        self.profit_pct.to_f64().unwrap_or(f64::NAN)
    }

    /// Identity used for deduplication.
    #[must_use]
    pub fn key(&self) -> (&str, ExchangeId, ExchangeId) {
        (&self.symbol, self.buy_exchange, self.sell_exchange)
    }
}

/// Orders candidates best first: profit percentage descending, then absolute
/// profit descending, then symbol, buy exchange and sell exchange names
/// ascending. Total, so sorting with it is deterministic.
#[must_use]
pub fn rank_order(a: &SpreadCandidate, b: &SpreadCandidate) -> Ordering {
    b.profit_pct
        .cmp(&a.profit_pct)
        .then_with(|| b.profit.cmp(&a.profit))
        .then_with(|| a.symbol.cmp(&b.symbol))
        .then_with(|| a.buy_exchange.as_str().cmp(b.buy_exchange.as_str()))
        .then_with(|| a.sell_exchange.as_str().cmp(b.sell_exchange.as_str()))
}

// =============================================================================
// Validated Candidate
// =============================================================================

/// A candidate whose buy and sell legs both passed every risk threshold,
/// with the metrics each leg was judged on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedCandidate {
    pub candidate: SpreadCandidate,
    /// Metrics of the symbol's history on the buy exchange.
    pub buy_metrics: RiskMetricsResult,
    /// Metrics of the symbol's history on the sell exchange.
    pub sell_metrics: RiskMetricsResult,
}

impl ValidatedCandidate {
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.candidate.symbol
    }

    #[must_use]
    pub fn reward_risk_ratio(&self) -> Option<f64> {
        self.candidate.reward_risk_ratio
    }
}
