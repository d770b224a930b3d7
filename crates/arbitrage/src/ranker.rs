//! Stage 3: final ordering of validated candidates.

use std::collections::HashSet;
use tracing::debug;

use crate::types::{rank_order, ValidatedCandidate};

/// Sorts validated candidates best first and removes duplicate pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultsRanker {
    limit: Option<usize>,
}

impl ResultsRanker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `n` results.
    #[must_use]
    pub fn with_limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Orders by profit percentage descending with the stage-1 tie-break.
    ///
    /// When the same (symbol, buy, sell) pair appears more than once, only
    /// the best-ranked entry is kept.
    #[must_use]
    pub fn rank(&self, mut candidates: Vec<ValidatedCandidate>) -> Vec<ValidatedCandidate> {
        let input = candidates.len();
        candidates.sort_by(|a, b| rank_order(&a.candidate, &b.candidate));

        let mut seen = HashSet::new();
        candidates.retain(|v| {
            let (symbol, buy, sell) = v.candidate.key();
            seen.insert((symbol.to_string(), buy, sell))
        });
        if let Some(limit) = self.limit {
            candidates.truncate(limit);
        }

        debug!(input, ranked = candidates.len(), "Stage 3 ranking complete");
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpreadCandidate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use spread_scan_core::ExchangeId;
    use spread_scan_risk::RiskMetricsResult;

    fn metrics() -> RiskMetricsResult {
        RiskMetricsResult {
            volatility: 0.1,
            sharpe: 1.0,
            sortino: 1.0,
            var: -0.01,
            cvar: -0.02,
            max_drawdown: 0.05,
            calmar: 2.0,
            omega: 1.5,
            hurst_exponent: 0.5,
            fractal_dimension: 1.5,
        }
    }

    fn validated(symbol: &str, buy: ExchangeId, sell: ExchangeId, pct: Decimal) -> ValidatedCandidate {
        ValidatedCandidate {
            candidate: SpreadCandidate {
                symbol: symbol.to_string(),
                buy_exchange: buy,
                sell_exchange: sell,
                buy_price: dec!(1),
                sell_price: dec!(1),
                volume: dec!(1),
                cost: dec!(100),
                revenue: dec!(100) + pct,
                profit: pct,
                profit_pct: pct,
                reward_risk_ratio: Some(1.0),
                depth: dec!(1),
            },
            buy_metrics: metrics(),
            sell_metrics: metrics(),
        }
    }

    #[test]
    fn test_sorted_by_profit_pct_descending() {
        let ranked = ResultsRanker::new().rank(vec![
            validated("A", ExchangeId::Binance, ExchangeId::Okx, dec!(1)),
            validated("B", ExchangeId::Binance, ExchangeId::Okx, dec!(3)),
            validated("C", ExchangeId::Binance, ExchangeId::Okx, dec!(2)),
        ]);
        let symbols: Vec<&str> = ranked.iter().map(ValidatedCandidate::symbol).collect();
        assert_eq!(symbols, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_duplicates_removed() {
        let ranked = ResultsRanker::new().rank(vec![
            validated("A", ExchangeId::Binance, ExchangeId::Okx, dec!(1)),
            validated("A", ExchangeId::Binance, ExchangeId::Okx, dec!(2)),
            validated("A", ExchangeId::Okx, ExchangeId::Binance, dec!(1)),
        ]);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].candidate.profit_pct, dec!(2));
    }

    #[test]
    fn test_ranking_is_order_independent() {
        let items = vec![
            validated("X", ExchangeId::Mexc, ExchangeId::Okx, dec!(2)),
            validated("X", ExchangeId::Bitget, ExchangeId::Okx, dec!(2)),
            validated("W", ExchangeId::Mexc, ExchangeId::Okx, dec!(2)),
        ];
        let mut reversed = items.clone();
        reversed.reverse();

        let a = ResultsRanker::new().rank(items);
        let b = ResultsRanker::new().rank(reversed);
        assert_eq!(a, b);
        assert_eq!(a[0].symbol(), "W");
        assert_eq!(a[1].candidate.buy_exchange, ExchangeId::Bitget);
    }

    #[test]
    fn test_limit() {
        let ranked = ResultsRanker::new().with_limit(1).rank(vec![
            validated("A", ExchangeId::Binance, ExchangeId::Okx, dec!(1)),
            validated("B", ExchangeId::Binance, ExchangeId::Okx, dec!(3)),
        ]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].symbol(), "B");
    }
}
