//! Shared market-data types for the spread scanner.
//!
//! Every stage of the pipeline consumes these by reference; nothing here is
//! mutated after it leaves the exchange client.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::error::ConfigError;

// =============================================================================
// Exchange Identifiers
// =============================================================================

/// Spot exchanges the scanner knows how to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Binance,
    Bitget,
    Htx,
    Okx,
    KuCoin,
    Bybit,
    Mexc,
    GateIo,
}

impl ExchangeId {
    /// All supported exchanges, in polling order.
    pub const ALL: [Self; 8] = [
        Self::Binance,
        Self::Bitget,
        Self::Htx,
        Self::Okx,
        Self::KuCoin,
        Self::Bybit,
        Self::Mexc,
        Self::GateIo,
    ];

    /// Returns the display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binance => "Binance",
            Self::Bitget => "Bitget",
            Self::Htx => "HTX",
            Self::Okx => "OKX",
            Self::KuCoin => "KuCoin",
            Self::Bybit => "Bybit",
            Self::Mexc => "MEXC",
            Self::GateIo => "GateIo",
        }
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(Self::Binance),
            "bitget" => Ok(Self::Bitget),
            "htx" | "huobi" => Ok(Self::Htx),
            "okx" => Ok(Self::Okx),
            "kucoin" => Ok(Self::KuCoin),
            "bybit" => Ok(Self::Bybit),
            "mexc" => Ok(Self::Mexc),
            "gateio" | "gate" | "gate.io" => Ok(Self::GateIo),
            other => Err(ConfigError::invalid(
                "exchange",
                format!("unknown exchange '{other}'"),
            )),
        }
    }
}

// =============================================================================
// Price Snapshot
// =============================================================================

/// Top-of-book quote for one symbol on one exchange, captured in one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub exchange: ExchangeId,
    /// Normalised symbol, e.g. `BTCUSDT`.
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub bid_volume: Decimal,
    pub ask_volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Returns true if both sides carry a positive price.
    #[must_use]
    pub fn is_quotable(&self) -> bool {
        self.bid > Decimal::ZERO && self.ask > Decimal::ZERO
    }

    /// Mid price, or the single positive side when the other is missing.
    #[must_use]
    pub fn mid(&self) -> Option<Decimal> {
        match (self.bid > Decimal::ZERO, self.ask > Decimal::ZERO) {
            (true, true) => Some((self.bid + self.ask) / Decimal::TWO),
            (true, false) => Some(self.bid),
            (false, true) => Some(self.ask),
            (false, false) => None,
        }
    }
}

/// All quotes returned by one exchange in one poll, keyed by symbol.
pub type TickerMap = BTreeMap<String, PriceSnapshot>;

/// Symbols listed by one exchange in the current cycle.
pub type SymbolSet = BTreeSet<String>;

/// Extracts the set of symbols that carry a usable two-sided quote.
#[must_use]
pub fn symbol_set(tickers: &TickerMap) -> SymbolSet {
    tickers
        .values()
        .filter(|snapshot| snapshot.is_quotable())
        .map(|snapshot| snapshot.symbol.clone())
        .collect()
}

// =============================================================================
// Order Book
// =============================================================================

/// One price level of an order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl BookLevel {
    #[must_use]
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }
}

/// Depth snapshot for one symbol on one exchange.
///
/// Bids are sorted best (highest) first and asks best (lowest) first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub exchange: ExchangeId,
    pub symbol: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub timestamp: DateTime<Utc>,
}

impl OrderBook {
    /// Builds a book from unsorted levels, dropping non-positive ones.
    #[must_use]
    pub fn new(
        exchange: ExchangeId,
        symbol: impl Into<String>,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let usable = |l: &BookLevel| l.price > Decimal::ZERO && l.quantity > Decimal::ZERO;
        let mut bids: Vec<BookLevel> = bids.into_iter().filter(usable).collect();
        let mut asks: Vec<BookLevel> = asks.into_iter().filter(usable).collect();
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self {
            exchange,
            symbol: symbol.into(),
            bids,
            asks,
            timestamp,
        }
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }
}
