//! `metrics`: risk metrics for one symbol's hourly history on one exchange.

use anyhow::{Context, Result};
use clap::Args;
use spread_scan_arbitrage::ScanPipeline;
use spread_scan_core::config_loader::DEFAULT_CONFIG_PATH;
use spread_scan_core::ExchangeId;
use spread_scan_exchanges::normalize;
use std::sync::Arc;
use tracing::info;

use crate::render;

/// Arguments for the metrics command.
#[derive(Args, Debug)]
pub struct MetricsArgs {
    /// Config file path.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Exchange to read history from (e.g. "binance", "okx").
    #[arg(short, long)]
    pub exchange: ExchangeId,

    /// Symbol in any common form ("BTCUSDT", "BTC-USDT", "btc_usdt").
    #[arg(short, long)]
    pub symbol: String,

    /// Number of hourly samples (overrides config).
    #[arg(long)]
    pub window: Option<usize>,

    /// Print the metrics as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Fetches history and prints every risk metric.
pub async fn run(args: MetricsArgs) -> Result<()> {
    let mut config = super::load_config(&args.config)?;
    if let Some(window) = args.window {
        config.scanner.history_window = window;
        config.validate().context("invalid --window")?;
    }

    let symbol = normalize(&args.symbol);
    info!(exchange = %args.exchange, symbol = %symbol, window = config.scanner.history_window, "Computing risk metrics");

    let client = super::http_client(&config)?;
    let pipeline = ScanPipeline::new(Arc::new(client), &config);
    let (samples, metrics) = pipeline
        .symbol_metrics(args.exchange, &symbol)
        .await
        .with_context(|| format!("failed to fetch {symbol} history from {}", args.exchange))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        println!(
            "{}",
            render::metrics_report(args.exchange, &symbol, samples, &metrics)
        );
    }
    Ok(())
}
