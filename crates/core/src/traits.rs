use crate::error::FetchError;
use crate::types::{ExchangeId, OrderBook, PriceSnapshot, TickerMap};
use async_trait::async_trait;

/// Source of raw market data for one or more exchanges.
///
/// Implementations perform I/O and may fail; callers are expected to go
/// through the rate-limited cache rather than hit the client directly.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Fetches the current top-of-book quote for every listed symbol.
    async fn fetch_tickers(&self, exchange: ExchangeId) -> Result<TickerMap, FetchError>;

    /// Fetches up to `window` historical snapshots for `symbol`, oldest first.
    async fn fetch_history(
        &self,
        exchange: ExchangeId,
        symbol: &str,
        window: usize,
    ) -> Result<Vec<PriceSnapshot>, FetchError>;

    /// Fetches up to `levels` price levels per side of the order book.
    async fn fetch_order_book(
        &self,
        exchange: ExchangeId,
        symbol: &str,
        levels: usize,
    ) -> Result<OrderBook, FetchError>;
}
