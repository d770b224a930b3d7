//! Cycle orchestration.
//!
//! One cycle fetches tickers from every enabled exchange concurrently, waits
//! for all of them to resolve, then runs the stages in order: common symbols,
//! spread detection, risk validation of both legs, ranking and order-book
//! depth. Exchanges or histories that fail to fetch are excluded from the
//! cycle; a missing order book keeps the top-of-book depth.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spread_scan_cache::{permit_pool, Clock, RateLimitedCache, RetryPolicy, SystemClock};
use spread_scan_core::{
    symbol_set, AppConfig, DepthConfig, ExchangeClient, ExchangeId, FetchError, OrderBook,
    PriceSnapshot, TickerMap,
};
use spread_scan_risk::RiskMetricsResult;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::depth::{market_depth, DEFAULT_DEPTH_BAND};
use crate::detector::{DetectorConfig, SpreadCalculator};
use crate::ranker::ResultsRanker;
use crate::resolver::CommonCoinResolver;
use crate::types::{SpreadCandidate, ValidatedCandidate};
use crate::validator::RiskValidator;

/// One symbol on one exchange.
type LegKey = (ExchangeId, String);

/// Order-book request size and the band counted as depth.
#[derive(Debug, Clone, Copy)]
struct DepthSettings {
    levels: usize,
    band: Decimal,
}

impl DepthSettings {
    fn from_config(config: &DepthConfig) -> Option<Self> {
        config.enabled.then(|| Self {
            levels: config.levels,
            band: Decimal::try_from(config.band).unwrap_or(DEFAULT_DEPTH_BAND),
        })
    }
}

// =============================================================================
// Cycle Report
// =============================================================================

/// Counts and timings for one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub started_at: DateTime<Utc>,
    pub exchanges_ok: Vec<ExchangeId>,
    /// Exchanges excluded from the cycle, with the reason.
    pub exchanges_failed: Vec<(ExchangeId, String)>,
    pub common_symbols: usize,
    pub stage1_candidates: usize,
    /// Candidates dropped because a leg's history could not be fetched.
    pub history_failures: usize,
    pub stage2_validated: usize,
    pub ranked: usize,
    /// Ranked candidates left at top-of-book depth for lack of an order book.
    pub depth_failures: usize,
    pub elapsed_ms: u64,
}

impl ScanSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            exchanges_ok: Vec::new(),
            exchanges_failed: Vec::new(),
            common_symbols: 0,
            stage1_candidates: 0,
            history_failures: 0,
            stage2_validated: 0,
            ranked: 0,
            depth_failures: 0,
            elapsed_ms: 0,
        }
    }
}

/// Result of one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Validated candidates, best first.
    pub opportunities: Vec<ValidatedCandidate>,
    pub summary: ScanSummary,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Runs scan cycles against an [`ExchangeClient`].
///
/// Ticker, history and order-book fetches go through rate-limited caches
/// that share one permit pool, so at most `max_concurrent_requests` requests
/// are in flight across all three. Retryable failures are repeated with
/// exponential backoff, each attempt taking its own permit.
pub struct ScanPipeline {
    client: Arc<dyn ExchangeClient>,
    exchanges: Vec<ExchangeId>,
    tickers: RateLimitedCache<ExchangeId, Arc<TickerMap>>,
    history: RateLimitedCache<LegKey, Arc<Vec<PriceSnapshot>>>,
    order_books: RateLimitedCache<LegKey, Arc<OrderBook>>,
    retry: RetryPolicy,
    ttl: Duration,
    history_window: usize,
    depth: Option<DepthSettings>,
    resolver: CommonCoinResolver,
    calculator: SpreadCalculator,
    validator: RiskValidator,
    ranker: ResultsRanker,
}

impl ScanPipeline {
    /// Creates a pipeline using the wall clock.
    #[must_use]
    pub fn new(client: Arc<dyn ExchangeClient>, config: &AppConfig) -> Self {
        Self::with_clock(client, config, Arc::new(SystemClock))
    }

    /// Creates a pipeline whose caches expire against `clock`.
    #[must_use]
    pub fn with_clock(
        client: Arc<dyn ExchangeClient>,
        config: &AppConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let permits = permit_pool(config.cache.max_concurrent_requests);
        let timeout = config.cache.request_timeout();

        let mut exchanges = config.exchanges.enabled.clone();
        exchanges.sort();
        exchanges.dedup();

        Self {
            client,
            exchanges,
            tickers: RateLimitedCache::with_permits(Arc::clone(&permits), timeout, Arc::clone(&clock)),
            history: RateLimitedCache::with_permits(Arc::clone(&permits), timeout, Arc::clone(&clock)),
            order_books: RateLimitedCache::with_permits(permits, timeout, clock),
            retry: RetryPolicy::from(&config.cache),
            ttl: config.cache.expiration(),
            history_window: config.scanner.history_window,
            depth: DepthSettings::from_config(&config.depth),
            resolver: CommonCoinResolver::new(),
            calculator: SpreadCalculator::new(DetectorConfig::from(&config.scanner)),
            validator: RiskValidator::from(&config.risk),
            ranker: ResultsRanker::new(),
        }
    }

    /// Replaces the stage-3 ranker, e.g. to limit output.
    #[must_use]
    pub fn with_ranker(mut self, ranker: ResultsRanker) -> Self {
        self.ranker = ranker;
        self
    }

    #[must_use]
    pub fn exchanges(&self) -> &[ExchangeId] {
        &self.exchanges
    }

    /// Runs one full cycle. Never fails: fetch errors shrink the result.
    pub async fn run_cycle(&self) -> ScanReport {
        let started = Instant::now();
        let mut summary = ScanSummary::new(Utc::now());

        // Fan out, then wait for every exchange before any stage runs.
        let fetched = join_all(self.exchanges.iter().map(|&ex| async move {
            (ex, self.fetch_tickers(ex).await)
        }))
        .await;

        let mut quotes: BTreeMap<ExchangeId, Arc<TickerMap>> = BTreeMap::new();
        for (exchange, result) in fetched {
            match result {
                Ok(tickers) => {
                    debug!(exchange = %exchange, symbols = tickers.len(), "Tickers fetched");
                    summary.exchanges_ok.push(exchange);
                    quotes.insert(exchange, tickers);
                }
                Err(e) => {
                    warn!(exchange = %exchange, error = %e, "Excluding exchange from cycle");
                    summary.exchanges_failed.push((exchange, e.to_string()));
                }
            }
        }

        let listings = quotes
            .iter()
            .map(|(ex, tickers)| (*ex, symbol_set(tickers)))
            .collect();
        let common = self.resolver.resolve(&listings);
        summary.common_symbols = common.len();

        let candidates = self.calculator.calculate(&common, &quotes);
        summary.stage1_candidates = candidates.len();

        let metrics = self.history_metrics(&candidates).await;
        let mut validated = Vec::new();
        for candidate in &candidates {
            let buy = metrics.get(&(candidate.buy_exchange, candidate.symbol.clone()));
            let sell = metrics.get(&(candidate.sell_exchange, candidate.symbol.clone()));
            match (buy, sell) {
                (Some(buy), Some(sell)) => {
                    validated.extend(self.validator.validate(candidate, buy, sell));
                }
                _ => summary.history_failures += 1,
            }
        }
        summary.stage2_validated = validated.len();

        let mut opportunities = self.ranker.rank(validated);
        summary.ranked = opportunities.len();
        summary.depth_failures = self.apply_depth(&mut opportunities).await;
        summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            exchanges_ok = summary.exchanges_ok.len(),
            exchanges_failed = summary.exchanges_failed.len(),
            common_symbols = summary.common_symbols,
            stage1 = summary.stage1_candidates,
            stage2 = summary.stage2_validated,
            ranked = summary.ranked,
            depth_failures = summary.depth_failures,
            elapsed_ms = summary.elapsed_ms,
            "Scan cycle complete"
        );

        ScanReport {
            opportunities,
            summary,
        }
    }

    /// Risk metrics for one symbol's history on one exchange.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if the history cannot be obtained.
    pub async fn symbol_metrics(
        &self,
        exchange: ExchangeId,
        symbol: &str,
    ) -> Result<(usize, RiskMetricsResult), FetchError> {
        let history = self.fetch_history(exchange, symbol).await?;
        Ok((history.len(), self.validator.metrics_for(&history)))
    }

    async fn fetch_tickers(&self, exchange: ExchangeId) -> Result<Arc<TickerMap>, FetchError> {
        self.retry
            .run("tickers", || {
                let client = Arc::clone(&self.client);
                self.tickers.get_or_fetch(
                    exchange,
                    move || async move { client.fetch_tickers(exchange).await.map(Arc::new) },
                    self.ttl,
                )
            })
            .await
    }

    async fn fetch_history(
        &self,
        exchange: ExchangeId,
        symbol: &str,
    ) -> Result<Arc<Vec<PriceSnapshot>>, FetchError> {
        let window = self.history_window;
        self.retry
            .run("history", || {
                let client = Arc::clone(&self.client);
                let owned = symbol.to_string();
                self.history.get_or_fetch(
                    (exchange, symbol.to_string()),
                    move || async move {
                        client
                            .fetch_history(exchange, &owned, window)
                            .await
                            .map(Arc::new)
                    },
                    self.ttl,
                )
            })
            .await
    }

    async fn fetch_order_book(
        &self,
        exchange: ExchangeId,
        symbol: &str,
        levels: usize,
    ) -> Result<Arc<OrderBook>, FetchError> {
        self.retry
            .run("order_book", || {
                let client = Arc::clone(&self.client);
                let owned = symbol.to_string();
                self.order_books.get_or_fetch(
                    (exchange, symbol.to_string()),
                    move || async move {
                        client
                            .fetch_order_book(exchange, &owned, levels)
                            .await
                            .map(Arc::new)
                    },
                    self.ttl,
                )
            })
            .await
    }

    /// Fetches each distinct leg history once, buy and sell sides alike, and
    /// computes its metrics. Keys whose fetch failed are absent from the
    /// result.
    async fn history_metrics(
        &self,
        candidates: &[SpreadCandidate],
    ) -> HashMap<LegKey, RiskMetricsResult> {
        let mut keys = leg_keys(candidates.iter());
        keys.sort();
        keys.dedup();

        let results = join_all(keys.into_iter().map(|(exchange, symbol)| async move {
            let result = self.fetch_history(exchange, &symbol).await;
            ((exchange, symbol), result)
        }))
        .await;

        let mut metrics = HashMap::new();
        for ((exchange, symbol), result) in results {
            match result {
                Ok(history) => {
                    let m = self.validator.metrics_for(&history);
                    metrics.insert((exchange, symbol), m);
                }
                Err(e) => {
                    warn!(exchange = %exchange, symbol = %symbol, error = %e, "History unavailable, excluding symbol");
                }
            }
        }
        metrics
    }

    /// Replaces each opportunity's depth with the order-book depth of its two
    /// legs. Returns how many opportunities kept top-of-book depth because a
    /// book could not be fetched.
    async fn apply_depth(&self, opportunities: &mut [ValidatedCandidate]) -> usize {
        let Some(settings) = self.depth else {
            return 0;
        };

        let mut keys = leg_keys(opportunities.iter().map(|v| &v.candidate));
        keys.sort();
        keys.dedup();

        let results = join_all(keys.into_iter().map(|(exchange, symbol)| async move {
            let result = self.fetch_order_book(exchange, &symbol, settings.levels).await;
            ((exchange, symbol), result)
        }))
        .await;

        let mut books = HashMap::new();
        for (key, result) in results {
            match result {
                Ok(book) => {
                    books.insert(key, book);
                }
                Err(e) => {
                    warn!(exchange = %key.0, symbol = %key.1, error = %e, "Order book unavailable, keeping top-of-book depth");
                }
            }
        }

        let mut failures = 0;
        for opportunity in opportunities.iter_mut() {
            let c = &mut opportunity.candidate;
            let buy = books.get(&(c.buy_exchange, c.symbol.clone()));
            let sell = books.get(&(c.sell_exchange, c.symbol.clone()));
            match (buy, sell) {
                (Some(buy), Some(sell)) => c.depth = market_depth(buy, sell, settings.band),
                _ => failures += 1,
            }
        }
        failures
    }
}

/// Buy and sell leg keys of every candidate, unsorted.
fn leg_keys<'a>(candidates: impl Iterator<Item = &'a SpreadCandidate>) -> Vec<LegKey> {
    candidates
        .flat_map(|c| {
            [
                (c.buy_exchange, c.symbol.clone()),
                (c.sell_exchange, c.symbol.clone()),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_starts_empty() {
        let summary = ScanSummary::new(Utc::now());
        assert!(summary.exchanges_ok.is_empty());
        assert_eq!(summary.ranked, 0);
        assert_eq!(summary.depth_failures, 0);
    }

    #[test]
    fn test_depth_settings_follow_config() {
        assert!(DepthSettings::from_config(&DepthConfig {
            enabled: false,
            ..DepthConfig::default()
        })
        .is_none());

        let settings = DepthSettings::from_config(&DepthConfig::default()).unwrap();
        assert_eq!(settings.levels, 100);
        assert_eq!(settings.band, DEFAULT_DEPTH_BAND);
    }
}
