//! Rate-limited, deduplicating fetch cache for exchange market data.
//!
//! # Example
//!
//! ```no_run
//! use spread_scan_cache::{RateLimitedCache, SystemClock};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), spread_scan_core::FetchError> {
//! let cache: RateLimitedCache<String, u64> =
//!     RateLimitedCache::new(10, Duration::from_secs(15), Arc::new(SystemClock));
//! let value = cache
//!     .get_or_fetch("BTCUSDT".to_string(), || async { Ok(42) }, Duration::from_secs(60))
//!     .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod retry;

pub use cache::{permit_pool, CacheEntry, RateLimitedCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use retry::{RetryPolicy, MAX_RETRY_DELAY};
