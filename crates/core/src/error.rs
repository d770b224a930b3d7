//! Error types for the spread scanner.
//!
//! Fetch failures are recoverable: the pipeline drops the affected
//! exchange or symbol for the cycle. Configuration errors are fatal at startup.

use thiserror::Error;

/// Errors raised while obtaining data from an exchange.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Exchange rejected the request for exceeding its quota.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Exchange returned a non-success status.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Response body or reason.
        message: String,
    },

    /// Permit acquisition or the fetch itself exceeded the request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Response body could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// The client has no endpoint for this exchange.
    #[error("unsupported exchange: {0}")]
    UnsupportedExchange(String),
}

impl FetchError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    #[must_use]
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Returns true if the request may succeed when repeated: network
    /// failures, timeouts, rate limits and 5xx responses.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Invalid or unreadable configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds a value outside its allowed range.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Configuration sources could not be read or merged.
    #[error("failed to load configuration: {0}")]
    Load(String),
}

impl ConfigError {
    /// Creates an invalid-value error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
