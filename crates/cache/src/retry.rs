//! Exponential backoff for transient fetch failures.
//!
//! Only errors for which [`FetchError::is_retryable`] holds are retried:
//! network failures, timeouts, rate limits and 5xx responses. Everything
//! else surfaces on the first attempt.

use spread_scan_core::{CacheConfig, FetchError};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Ceiling for the delay between attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How many times, and how patiently, a failed fetch is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl From<&CacheConfig> for RetryPolicy {
    fn from(config: &CacheConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// `max_retries` extra attempts are spent. The delay starts at the base
    /// delay and doubles per attempt up to [`MAX_RETRY_DELAY`].
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `op`.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut delay = self.base_delay.min(MAX_RETRY_DELAY);

        for attempt in 0..=self.max_retries {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        delay_ms = delay.as_millis(),
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY);
                }
                Err(e) => return Err(e),
            }
        }

        // The final iteration always returns.
        Err(FetchError::Network(format!("{operation}: retries exhausted")))
    }
}
