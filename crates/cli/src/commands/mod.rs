//! CLI commands for the spread scanner.

pub mod metrics;
pub mod scan;

pub use metrics::MetricsArgs;
pub use scan::ScanArgs;

use anyhow::{Context, Result};
use spread_scan_core::{AppConfig, ConfigLoader};
use spread_scan_exchanges::{HttpClientConfig, HttpExchangeClient};

/// Loads and validates configuration from `path` and the environment.
pub fn load_config(path: &str) -> Result<AppConfig> {
    ConfigLoader::load_from(path).with_context(|| format!("failed to load configuration from {path}"))
}

/// Builds the HTTP client with the configured user agent and timeout.
pub fn http_client(config: &AppConfig) -> Result<HttpExchangeClient> {
    let http = HttpClientConfig::from(&config.exchanges)
        .with_timeout_secs(config.cache.request_timeout_secs);
    HttpExchangeClient::new(http).context("failed to build exchange client")
}
