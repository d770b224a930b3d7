//! Stage 1: cross-exchange spread detection.
//!
//! For every symbol listed on two or more exchanges, each ordered pair of
//! distinct exchanges is priced as "buy at the ask here, sell at the bid
//! there". Pairs that do not clear the profit band or the liquidity floor are
//! dropped before any risk work is done.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use spread_scan_core::{ExchangeId, PriceSnapshot, ScannerConfig, TickerMap};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

use crate::fees::FeeSchedule;
use crate::resolver::CommonSymbols;
use crate::types::{rank_order, SpreadCandidate};

// =============================================================================
// Detection Configuration
// =============================================================================

/// Thresholds for stage-1 filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum profit percentage (e.g. `0.5` for 0.5%).
    pub min_profit_pct: Decimal,

    /// Spreads above this percentage are discarded as mismatched assets.
    pub max_profit_pct: Option<Decimal>,

    /// Cap on executable volume per candidate.
    pub max_trade_volume: Decimal,

    /// Liquidity floor; zero still requires a positive volume.
    pub min_trade_volume: Decimal,

    pub fees: FeeSchedule,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_profit_pct: dec!(0.5),
            max_profit_pct: Some(dec!(75)),
            max_trade_volume: dec!(1000),
            min_trade_volume: Decimal::ZERO,
            fees: FeeSchedule::zero(),
        }
    }
}

/// Converts a configured value, keeping `fallback` when it does not fit a
/// `Decimal`. A configured ceiling is never silently dropped.
fn to_decimal(field: &str, value: f64, fallback: Decimal) -> Decimal {
    Decimal::try_from(value).unwrap_or_else(|_| {
        warn!(field, value, fallback = %fallback, "Value out of decimal range, using default");
        fallback
    })
}

impl From<&ScannerConfig> for DetectorConfig {
    fn from(config: &ScannerConfig) -> Self {
        let defaults = Self::default();
        let default_ceiling = defaults.max_profit_pct.unwrap_or(dec!(75));
        Self {
            min_profit_pct: to_decimal(
                "min_profit_percentage",
                config.min_profit_percentage,
                defaults.min_profit_pct,
            ),
            max_profit_pct: config
                .max_profit_percentage
                .map(|v| to_decimal("max_profit_percentage", v, default_ceiling)),
            max_trade_volume: to_decimal(
                "max_trade_volume",
                config.max_trade_volume,
                defaults.max_trade_volume,
            ),
            min_trade_volume: to_decimal(
                "min_trade_volume",
                config.min_trade_volume,
                defaults.min_trade_volume,
            ),
            fees: FeeSchedule::new(
                to_decimal("taker_fee", config.taker_fee, Decimal::ZERO),
                to_decimal("maker_fee", config.maker_fee, Decimal::ZERO),
            ),
        }
    }
}

impl DetectorConfig {
    #[must_use]
    pub fn with_min_profit_pct(mut self, pct: Decimal) -> Self {
        self.min_profit_pct = pct;
        self
    }

    #[must_use]
    pub fn with_max_profit_pct(mut self, pct: Option<Decimal>) -> Self {
        self.max_profit_pct = pct;
        self
    }

    #[must_use]
    pub fn with_max_trade_volume(mut self, volume: Decimal) -> Self {
        self.max_trade_volume = volume;
        self
    }

    #[must_use]
    pub fn with_min_trade_volume(mut self, volume: Decimal) -> Self {
        self.min_trade_volume = volume;
        self
    }

    #[must_use]
    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }
}

// =============================================================================
// Spread Calculator
// =============================================================================

/// Prices every ordered exchange pair for each common symbol.
#[derive(Debug, Clone, Default)]
pub struct SpreadCalculator {
    config: DetectorConfig,
}

impl SpreadCalculator {
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Returns all surviving candidates, best first.
    #[must_use]
    pub fn calculate<T: Borrow<TickerMap>>(
        &self,
        common: &CommonSymbols,
        tickers: &BTreeMap<ExchangeId, T>,
    ) -> Vec<SpreadCandidate> {
        let mut candidates = Vec::new();
        let mut pairs_checked = 0usize;

        for (symbol, exchanges) in common {
            let quotes: Vec<&PriceSnapshot> = exchanges
                .iter()
                .filter_map(|ex| tickers.get(ex).and_then(|t| t.borrow().get(symbol)))
                .collect();

            for buy in &quotes {
                for sell in &quotes {
                    if buy.exchange == sell.exchange {
                        continue;
                    }
                    pairs_checked += 1;
                    if let Some(candidate) = self.check_pair(symbol, buy, sell) {
                        candidates.push(candidate);
                    }
                }
            }
        }

        candidates.sort_by(rank_order);
        debug!(
            symbols = common.len(),
            pairs_checked,
            candidates = candidates.len(),
            "Stage 1 spread detection complete"
        );
        candidates
    }

    /// Prices buying `symbol` on `buy` and selling it on `sell`.
    #[must_use]
    pub fn check_pair(
        &self,
        symbol: &str,
        buy: &PriceSnapshot,
        sell: &PriceSnapshot,
    ) -> Option<SpreadCandidate> {
        if buy.exchange == sell.exchange {
            return None;
        }
        if !buy.is_quotable() || !sell.is_quotable() {
            trace!(symbol, buy = %buy.exchange, sell = %sell.exchange, "Missing quote side");
            return None;
        }

        let depth = buy.ask_volume.min(sell.bid_volume);
        let volume = depth.min(self.config.max_trade_volume);
        if volume <= Decimal::ZERO || volume < self.config.min_trade_volume {
            trace!(
                symbol,
                buy = %buy.exchange,
                sell = %sell.exchange,
                volume = %volume,
                min_volume = %self.config.min_trade_volume,
                "Insufficient depth"
            );
            return None;
        }

        let cost = self.config.fees.buy_cost(volume, buy.ask);
        let revenue = self.config.fees.sell_revenue(volume, sell.bid);
        let profit = revenue - cost;
        let profit_pct = profit / cost * dec!(100);

        if profit_pct < self.config.min_profit_pct {
            trace!(
                symbol,
                buy = %buy.exchange,
                sell = %sell.exchange,
                profit_pct = %profit_pct.round_dp(4),
                "Spread below minimum"
            );
            return None;
        }
        if let Some(max) = self.config.max_profit_pct {
            if profit_pct > max {
                debug!(
                    symbol,
                    buy = %buy.exchange,
                    sell = %sell.exchange,
                    profit_pct = %profit_pct.round_dp(2),
                    "Spread above ceiling, likely a different asset"
                );
                return None;
            }
        }

        Some(SpreadCandidate {
            symbol: symbol.to_string(),
            buy_exchange: buy.exchange,
            sell_exchange: sell.exchange,
            buy_price: buy.ask,
            sell_price: sell.bid,
            volume,
            cost,
            revenue,
            profit,
            profit_pct,
            reward_risk_ratio: None,
            depth,
        })
    }
}
