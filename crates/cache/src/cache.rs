//! Rate-limited fetch cache.
//!
//! Each key owns an async slot. A caller locks the slot, returns the stored
//! value if it is still live, and otherwise performs the fetch while holding
//! the slot, so concurrent callers for the same key queue behind the one
//! in-flight request and then observe its result. Network concurrency across
//! all keys is bounded by a shared semaphore.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use spread_scan_core::FetchError;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tracing::{debug, trace, warn};

use crate::clock::Clock;

/// A cached value together with when it was fetched and how long it lives.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Time elapsed since the fetch; zero if the clock moved backwards.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// An entry expires once strictly more than `ttl` has elapsed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > self.ttl
    }
}

type Slot<V> = Arc<AsyncMutex<Option<CacheEntry<V>>>>;

/// A permit pool of `size` permits, clamped to what a semaphore can hold.
/// Always has at least one permit.
#[must_use]
pub fn permit_pool(size: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(size.clamp(1, Semaphore::MAX_PERMITS)))
}

/// Time-bounded cache whose misses go through a bounded pool of request permits.
pub struct RateLimitedCache<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
    permits: Arc<Semaphore>,
    request_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> Debug for RateLimitedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedCache")
            .field("keys", &self.slots.lock().len())
            .field("available_permits", &self.permits.available_permits())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl<K, V> RateLimitedCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Creates a cache with its own pool of `max_concurrent_requests` permits.
    #[must_use]
    pub fn new(
        max_concurrent_requests: usize,
        request_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_permits(permit_pool(max_concurrent_requests), request_timeout, clock)
    }

    /// Creates a cache that draws from an existing permit pool, so several
    /// caches can share one bound on outstanding exchange requests.
    #[must_use]
    pub fn with_permits(
        permits: Arc<Semaphore>,
        request_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            permits,
            request_timeout,
            clock,
        }
    }

    fn slot(&self, key: &K) -> Slot<V> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Returns the live value for `key`, fetching it with `fetch` on a miss.
    ///
    /// Concurrent calls for the same key never issue duplicate fetches: later
    /// callers wait for the in-flight request and receive its stored result.
    /// A failed fetch stores nothing, so the next caller retries.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Timeout`] if no permit becomes available or the
    /// fetch does not complete within the request timeout, or the error
    /// produced by `fetch`.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F, ttl: Duration) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>>,
    {
        let slot = self.slot(&key);
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            let now = self.clock.now();
            if !cached.is_expired(now) {
                trace!(key = ?key, age_ms = cached.age(now).as_millis(), "Cache hit");
                return Ok(cached.value.clone());
            }
            debug!(key = ?key, age_secs = cached.age(now).as_secs(), "Cache entry expired");
            *entry = None;
        }

        let _permit = match tokio::time::timeout(self.request_timeout, self.permits.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(FetchError::Network("request gate closed".to_string())),
            Err(_) => {
                warn!(
                    key = ?key,
                    timeout_ms = self.request_timeout.as_millis(),
                    "Timed out waiting for a request permit"
                );
                return Err(FetchError::Timeout(format!(
                    "no request permit for {key:?} within {:?}",
                    self.request_timeout
                )));
            }
        };

        trace!(key = ?key, "Cache miss, fetching");
        let value = match tokio::time::timeout(self.request_timeout, fetch()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(key = ?key, timeout_ms = self.request_timeout.as_millis(), "Fetch timed out");
                return Err(FetchError::Timeout(format!(
                    "fetch for {key:?} exceeded {:?}",
                    self.request_timeout
                )));
            }
        };

        *entry = Some(CacheEntry {
            value: value.clone(),
            fetched_at: self.clock.now(),
            ttl,
        });

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(60);

    fn system_cache(permits: usize, timeout: Duration) -> RateLimitedCache<String, u64> {
        RateLimitedCache::new(permits, timeout, Arc::new(SystemClock))
    }

    fn counting_fetch(
        counter: &AtomicUsize,
        value: u64,
    ) -> impl Future<Output = Result<u64, FetchError>> + '_ {
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    // ============================================
    // Hit / Miss
    // ============================================

    #[tokio::test]
    async fn live_entry_is_served_without_fetching() {
        let cache = system_cache(2, Duration::from_secs(1));
        let counter = AtomicUsize::new(0);

        let first = cache
            .get_or_fetch("BTCUSDT".to_string(), || counting_fetch(&counter, 7), TTL)
            .await
            .unwrap();
        let second = cache
            .get_or_fetch("BTCUSDT".to_string(), || counting_fetch(&counter, 8), TTL)
            .await
            .unwrap();

        assert_eq!(first, 7);
        assert_eq!(second, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_fetch_independently() {
        let cache = system_cache(2, Duration::from_secs(1));
        let counter = AtomicUsize::new(0);

        cache
            .get_or_fetch("a".to_string(), || counting_fetch(&counter, 1), TTL)
            .await
            .unwrap();
        cache
            .get_or_fetch("b".to_string(), || counting_fetch(&counter, 2), TTL)
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    // ============================================
    // Expiry
    // ============================================

    #[tokio::test]
    async fn entry_lives_for_ttl_then_refetches() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(t0));
        let cache: RateLimitedCache<String, u64> =
            RateLimitedCache::new(1, Duration::from_secs(1), clock.clone());
        let counter = AtomicUsize::new(0);
        let key = "ETHUSDT".to_string();

        let v0 = cache
            .get_or_fetch(key.clone(), || counting_fetch(&counter, 1), TTL)
            .await
            .unwrap();
        assert_eq!(v0, 1);

        clock.set(t0 + chrono::Duration::seconds(59));
        let v59 = cache
            .get_or_fetch(key.clone(), || counting_fetch(&counter, 2), TTL)
            .await
            .unwrap();
        assert_eq!(v59, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        clock.set(t0 + chrono::Duration::seconds(61));
        let v61 = cache
            .get_or_fetch(key.clone(), || counting_fetch(&counter, 3), TTL)
            .await
            .unwrap();
        assert_eq!(v61, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn entry_expiry_is_strict() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let entry = CacheEntry {
            value: (),
            fetched_at: t0,
            ttl: TTL,
        };

        assert!(!entry.is_expired(t0 + chrono::Duration::seconds(60)));
        assert!(entry.is_expired(t0 + chrono::Duration::seconds(60) + chrono::Duration::milliseconds(1)));
        assert!(!entry.is_expired(t0 - chrono::Duration::seconds(5)));
    }

    // ============================================
    // Deduplication
    // ============================================

    #[tokio::test]
    async fn concurrent_requests_for_same_key_fetch_once() {
        let cache = system_cache(4, Duration::from_secs(2));
        let counter = AtomicUsize::new(0);
        let counter = &counter;

        let slow_fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(42)
        };

        let (a, b) = tokio::join!(
            cache.get_or_fetch("SOLUSDT".to_string(), slow_fetch, TTL),
            cache.get_or_fetch("SOLUSDT".to_string(), slow_fetch, TTL),
        );

        assert_eq!(a.unwrap(), 42);
        assert_eq!(b.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    // ============================================
    // Permits and Timeouts
    // ============================================

    #[tokio::test]
    async fn permit_wait_times_out_without_fetching() {
        let permits = permit_pool(1);
        let cache: RateLimitedCache<String, u64> =
            RateLimitedCache::with_permits(Arc::clone(&permits), Duration::from_millis(50), Arc::new(SystemClock));
        let _held = permits.acquire_owned().await.unwrap();
        let counter = AtomicUsize::new(0);

        let result = cache
            .get_or_fetch("k".to_string(), || counting_fetch(&counter, 1), TTL)
            .await;

        assert!(matches!(result, Err(FetchError::Timeout(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_fetch_times_out_and_is_not_cached() {
        let permits = permit_pool(1);
        let cache: RateLimitedCache<String, u64> =
            RateLimitedCache::with_permits(Arc::clone(&permits), Duration::from_millis(50), Arc::new(SystemClock));
        let counter = AtomicUsize::new(0);

        let result = cache
            .get_or_fetch(
                "k".to_string(),
                || async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(1)
                },
                TTL,
            )
            .await;
        assert!(matches!(result, Err(FetchError::Timeout(_))));
        assert_eq!(permits.available_permits(), 1);

        let retry = cache
            .get_or_fetch("k".to_string(), || counting_fetch(&counter, 2), TTL)
            .await;
        assert_eq!(retry.unwrap(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_is_retried_by_next_caller() {
        let cache = system_cache(1, Duration::from_secs(1));
        let counter = AtomicUsize::new(0);

        let failed = cache
            .get_or_fetch(
                "k".to_string(),
                || async { Err(FetchError::Network("connection reset".into())) },
                TTL,
            )
            .await;
        assert_eq!(failed, Err(FetchError::Network("connection reset".into())));

        let ok = cache
            .get_or_fetch("k".to_string(), || counting_fetch(&counter, 9), TTL)
            .await;
        assert_eq!(ok, Ok(9));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn in_flight_requests_never_exceed_permits() {
        let cache = Arc::new(system_cache(3, Duration::from_secs(2)));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..10u64 {
            let cache = Arc::clone(&cache);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(
                        format!("key-{i}"),
                        || async move {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                            Ok(i)
                        },
                        TTL,
                    )
                    .await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn shared_permit_pool_is_observed_by_both_caches() {
        let permits = Arc::new(Semaphore::new(1));
        let tickers: RateLimitedCache<String, u64> =
            RateLimitedCache::with_permits(Arc::clone(&permits), Duration::from_millis(50), Arc::new(SystemClock));
        let history: RateLimitedCache<(String, String), Vec<u64>> =
            RateLimitedCache::with_permits(Arc::clone(&permits), Duration::from_millis(50), Arc::new(SystemClock));

        let _held = permits.clone().acquire_owned().await.unwrap();

        assert!(tickers
            .get_or_fetch("a".to_string(), || async { Ok(1) }, TTL)
            .await
            .is_err());
        assert!(history
            .get_or_fetch(("a".to_string(), "b".to_string()), || async { Ok(vec![1]) }, TTL)
            .await
            .is_err());
    }

    #[test]
    fn permit_pool_is_clamped() {
        assert_eq!(permit_pool(0).available_permits(), 1);
        assert_eq!(permit_pool(usize::MAX).available_permits(), Semaphore::MAX_PERMITS);
        assert_eq!(permit_pool(4).available_permits(), 4);
    }
}
