//! REST client for public spot market data with per-exchange rate limiting.
//!
//! One [`reqwest::Client`] is shared across exchanges. Each exchange gets its
//! own governor quota so that a slow venue cannot starve the others.
//!
//! # Example
//!
//! ```ignore
//! use spread_scan_core::{ExchangeClient, ExchangeId};
//! use spread_scan_exchanges::{HttpClientConfig, HttpExchangeClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HttpExchangeClient::new(HttpClientConfig::default())?;
//!     let tickers = client.fetch_tickers(ExchangeId::Binance).await?;
//!     println!("Binance lists {} symbols", tickers.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use serde_json::Value;
use spread_scan_core::{
    ExchangeClient, ExchangeId, ExchangesConfig, FetchError, OrderBook, PriceSnapshot, TickerMap,
};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::parsers::{parse_klines, parse_order_book, parse_tickers};
use crate::symbols::exchange_symbol;

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

// =============================================================================
// Constants
// =============================================================================

/// Largest kline page any supported exchange serves in one request.
pub const MAX_KLINE_LIMIT: usize = 1000;

/// Deepest order book each exchange serves in one request.
#[must_use]
pub fn max_book_levels(exchange: ExchangeId) -> usize {
    match exchange {
        ExchangeId::Binance | ExchangeId::Mexc => 1000,
        ExchangeId::Okx => 400,
        ExchangeId::Bybit => 200,
        ExchangeId::Bitget | ExchangeId::Htx => 150,
        ExchangeId::KuCoin | ExchangeId::GateIo => 100,
    }
}

/// Public REST root for each exchange.
#[must_use]
pub fn default_base_url(exchange: ExchangeId) -> &'static str {
    match exchange {
        ExchangeId::Binance => "https://api.binance.com",
        ExchangeId::Bitget => "https://api.bitget.com",
        ExchangeId::Htx => "https://api.huobi.pro",
        ExchangeId::Okx => "https://www.okx.com",
        ExchangeId::KuCoin => "https://api.kucoin.com",
        ExchangeId::Bybit => "https://api.bybit.com",
        ExchangeId::Mexc => "https://api.mexc.com",
        ExchangeId::GateIo => "https://api.gateio.ws",
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for [`HttpExchangeClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL overrides; exchanges not present use [`default_base_url`].
    pub base_urls: BTreeMap<ExchangeId, String>,

    /// Requests per minute allowed per exchange.
    pub requests_per_minute: NonZeroU32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_urls: BTreeMap::new(),
            requests_per_minute: nonzero!(600u32),
            timeout_secs: 15,
            user_agent: ExchangesConfig::default().user_agent,
        }
    }
}

impl From<&ExchangesConfig> for HttpClientConfig {
    fn from(config: &ExchangesConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            ..Self::default()
        }
    }
}

impl HttpClientConfig {
    /// Points one exchange at a different host.
    #[must_use]
    pub fn with_base_url(mut self, exchange: ExchangeId, url: impl Into<String>) -> Self {
        self.base_urls.insert(exchange, url.into());
        self
    }

    /// Sets the per-exchange rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_minute: NonZeroU32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Base URL in effect for `exchange`, without a trailing slash.
    #[must_use]
    pub fn base_url(&self, exchange: ExchangeId) -> &str {
        self.base_urls
            .get(&exchange)
            .map_or(default_base_url(exchange), String::as_str)
            .trim_end_matches('/')
    }
}

// =============================================================================
// Endpoint Paths
// =============================================================================

fn tickers_path(exchange: ExchangeId) -> &'static str {
    match exchange {
        ExchangeId::Binance | ExchangeId::Mexc => "/api/v3/ticker/bookTicker",
        ExchangeId::Bitget => "/api/spot/v1/market/tickers",
        ExchangeId::Htx => "/market/tickers",
        ExchangeId::Okx => "/api/v5/market/tickers?instType=SPOT",
        ExchangeId::KuCoin => "/api/v1/market/allTickers",
        ExchangeId::Bybit => "/v5/market/tickers?category=spot",
        ExchangeId::GateIo => "/api/v4/spot/tickers",
    }
}

/// Hourly candles covering the last `window` hours.
fn klines_path(exchange: ExchangeId, symbol: &str, window: usize) -> String {
    let market = exchange_symbol(exchange, symbol);
    let limit = window.clamp(1, MAX_KLINE_LIMIT);
    match exchange {
        ExchangeId::Binance => {
            format!("/api/v3/klines?symbol={market}&interval=1h&limit={limit}")
        }
        ExchangeId::Mexc => {
            format!("/api/v3/klines?symbol={market}&interval=60m&limit={limit}")
        }
        ExchangeId::Bitget => format!(
            "/api/v2/spot/market/candles?symbol={market}&granularity=1h&limit={limit}"
        ),
        ExchangeId::Htx => {
            format!("/market/history/kline?symbol={market}&period=60min&size={limit}")
        }
        ExchangeId::Okx => {
            format!("/api/v5/market/candles?instId={market}&bar=1H&limit={limit}")
        }
        ExchangeId::KuCoin => {
            let end = Utc::now().timestamp();
            let start = end - i64::try_from(limit).unwrap_or(i64::MAX / 3600) * 3600;
            format!(
                "/api/v1/market/candles?type=1hour&symbol={market}&startAt={start}&endAt={end}"
            )
        }
        ExchangeId::Bybit => format!(
            "/v5/market/kline?category=spot&symbol={market}&interval=60&limit={limit}"
        ),
        ExchangeId::GateIo => format!(
            "/api/v4/spot/candlesticks?currency_pair={market}&interval=1h&limit={limit}"
        ),
    }
}

/// Order book with up to `levels` price levels per side.
fn order_book_path(exchange: ExchangeId, symbol: &str, levels: usize) -> String {
    let market = exchange_symbol(exchange, symbol);
    let limit = levels.clamp(1, max_book_levels(exchange));
    match exchange {
        ExchangeId::Binance | ExchangeId::Mexc => {
            format!("/api/v3/depth?symbol={market}&limit={limit}")
        }
        ExchangeId::Bitget => format!(
            "/api/v2/spot/market/orderbook?symbol={market}&type=step0&limit={limit}"
        ),
        // Always 150 levels; the `depth` parameter only narrows to 5, 10 or 20.
        ExchangeId::Htx => format!("/market/depth?symbol={market}&type=step0"),
        ExchangeId::Okx => format!("/api/v5/market/books?instId={market}&sz={limit}"),
        ExchangeId::KuCoin => {
            let depth = if limit <= 20 { 20 } else { 100 };
            format!("/api/v1/market/orderbook/level2_{depth}?symbol={market}")
        }
        ExchangeId::Bybit => format!(
            "/v5/market/orderbook?category=spot&symbol={market}&limit={limit}"
        ),
        ExchangeId::GateIo => format!(
            "/api/v4/spot/order_book?currency_pair={market}&limit={limit}"
        ),
    }
}

// =============================================================================
// Client
// =============================================================================

/// Public market-data client for every [`ExchangeId`].
pub struct HttpExchangeClient {
    config: HttpClientConfig,
    http: Client,
    limiters: BTreeMap<ExchangeId, Arc<DirectLimiter>>,
}

impl std::fmt::Debug for HttpExchangeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExchangeClient")
            .field("base_urls", &self.config.base_urls)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .finish_non_exhaustive()
    }
}

impl HttpExchangeClient {
    /// Creates a client with one rate limiter per exchange.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: HttpClientConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let limiters = ExchangeId::ALL
            .iter()
            .map(|&exchange| (exchange, Arc::new(RateLimiter::direct(quota))))
            .collect();

        Ok(Self {
            config,
            http,
            limiters,
        })
    }

    #[must_use]
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    async fn get_json(&self, exchange: ExchangeId, path: &str) -> Result<Value, FetchError> {
        if let Some(limiter) = self.limiters.get(&exchange) {
            limiter.until_ready().await;
        }

        let url = format!("{}{path}", self.config.base_url(exchange));
        debug!(exchange = %exchange, url = %url, "GET");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        Self::handle_response(exchange, response).await
    }

    async fn handle_response(
        exchange: ExchangeId,
        response: reqwest::Response,
    ) -> Result<Value, FetchError> {
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            warn!(exchange = %exchange, retry_after, "Rate limited by exchange");
            return Err(FetchError::rate_limit(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FetchError::api(status.as_u16(), text));
        }

        response.json::<Value>().await.map_err(map_reqwest_error)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else if err.is_decode() {
        FetchError::Parse(err.to_string())
    } else {
        FetchError::Network(err.to_string())
    }
}

#[async_trait]
impl ExchangeClient for HttpExchangeClient {
    async fn fetch_tickers(&self, exchange: ExchangeId) -> Result<TickerMap, FetchError> {
        let body = self.get_json(exchange, tickers_path(exchange)).await?;
        parse_tickers(exchange, &body, Utc::now())
    }

    async fn fetch_history(
        &self,
        exchange: ExchangeId,
        symbol: &str,
        window: usize,
    ) -> Result<Vec<PriceSnapshot>, FetchError> {
        let body = self
            .get_json(exchange, &klines_path(exchange, symbol, window))
            .await?;
        let mut history = parse_klines(exchange, symbol, &body)?;

        if history.len() > window {
            history.drain(..history.len() - window);
        }
        Ok(history)
    }

    async fn fetch_order_book(
        &self,
        exchange: ExchangeId,
        symbol: &str,
        levels: usize,
    ) -> Result<OrderBook, FetchError> {
        let body = self
            .get_json(exchange, &order_book_path(exchange, symbol, levels))
            .await?;
        let mut book = parse_order_book(exchange, symbol, &body, Utc::now())?;

        book.bids.truncate(levels);
        book.asks.truncate(levels);
        Ok(book)
    }
}
