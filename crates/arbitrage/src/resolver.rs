//! Intersection of per-exchange symbol listings.

use spread_scan_core::{ExchangeId, SymbolSet};
use std::collections::BTreeMap;
use tracing::debug;

/// Symbols listed on at least two exchanges, each with its sorted list of
/// exchanges.
pub type CommonSymbols = BTreeMap<String, Vec<ExchangeId>>;

/// Finds symbols that can be traded across exchanges.
#[derive(Debug, Clone, Copy)]
pub struct CommonCoinResolver {
    min_exchanges: usize,
}

impl Default for CommonCoinResolver {
    fn default() -> Self {
        Self { min_exchanges: 2 }
    }
}

impl CommonCoinResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a symbol to appear on at least `n` exchanges. Values below 2
    /// are raised to 2, since a spread needs two venues.
    #[must_use]
    pub fn with_min_exchanges(n: usize) -> Self {
        Self {
            min_exchanges: n.max(2),
        }
    }

    /// Returns every symbol listed on at least `min_exchanges` of the given
    /// exchanges. Fewer responding exchanges than that yields an empty map.
    #[must_use]
    pub fn resolve(&self, listings: &BTreeMap<ExchangeId, SymbolSet>) -> CommonSymbols {
        if listings.len() < self.min_exchanges {
            debug!(
                exchanges = listings.len(),
                required = self.min_exchanges,
                "Not enough exchanges to resolve common symbols"
            );
            return CommonSymbols::new();
        }

        let mut venues: CommonSymbols = BTreeMap::new();
        for (exchange, symbols) in listings {
            for symbol in symbols {
                venues.entry(symbol.clone()).or_default().push(*exchange);
            }
        }
        venues.retain(|_, exchanges| exchanges.len() >= self.min_exchanges);

        debug!(
            exchanges = listings.len(),
            common_symbols = venues.len(),
            "Resolved common symbols"
        );
        venues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(symbols: &[&str]) -> SymbolSet {
        symbols.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_symbol_on_one_exchange_is_excluded() {
        let mut listings = BTreeMap::new();
        listings.insert(ExchangeId::Binance, set(&["BTCUSDT", "ONLYBINANCE"]));
        listings.insert(ExchangeId::Okx, set(&["BTCUSDT", "ETHUSDT"]));
        listings.insert(ExchangeId::Bybit, set(&["ETHUSDT"]));

        let common = CommonCoinResolver::new().resolve(&listings);

        assert_eq!(common.len(), 2);
        assert_eq!(common["BTCUSDT"], vec![ExchangeId::Binance, ExchangeId::Okx]);
        assert_eq!(common["ETHUSDT"], vec![ExchangeId::Okx, ExchangeId::Bybit]);
        assert!(!common.contains_key("ONLYBINANCE"));
    }

    #[test]
    fn test_single_exchange_yields_empty() {
        let mut listings = BTreeMap::new();
        listings.insert(ExchangeId::Binance, set(&["BTCUSDT"]));
        assert!(CommonCoinResolver::new().resolve(&listings).is_empty());
        assert!(CommonCoinResolver::new().resolve(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_min_exchanges_threshold() {
        let mut listings = BTreeMap::new();
        listings.insert(ExchangeId::Binance, set(&["A", "B"]));
        listings.insert(ExchangeId::Okx, set(&["A", "B"]));
        listings.insert(ExchangeId::Mexc, set(&["A"]));

        let common = CommonCoinResolver::with_min_exchanges(3).resolve(&listings);
        assert_eq!(common.keys().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(CommonCoinResolver::with_min_exchanges(0).resolve(&listings).len(), 2);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let mut listings = BTreeMap::new();
        listings.insert(ExchangeId::GateIo, set(&["X", "Y", "Z"]));
        listings.insert(ExchangeId::Htx, set(&["Z", "Y"]));

        let first = CommonCoinResolver::new().resolve(&listings);
        let second = CommonCoinResolver::new().resolve(&listings.clone());
        assert_eq!(first, second);
    }
}
