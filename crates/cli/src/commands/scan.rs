//! `scan`: one or more full pipeline cycles over the enabled exchanges.

use anyhow::{Context, Result};
use clap::Args;
use spread_scan_arbitrage::{ResultsRanker, ScanPipeline, ScanReport};
use spread_scan_core::config_loader::DEFAULT_CONFIG_PATH;
use spread_scan_core::{AppConfig, ExchangeId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

use crate::render;

/// Arguments for the scan command.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Config file path.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Minimum profit percentage (overrides config).
    #[arg(long)]
    pub min_profit: Option<f64>,

    /// Maximum trade volume per candidate (overrides config).
    #[arg(long)]
    pub max_volume: Option<f64>,

    /// Comma-separated exchanges to scan (overrides config).
    #[arg(long, value_delimiter = ',')]
    pub exchanges: Vec<ExchangeId>,

    /// Keep scanning until Ctrl+C.
    #[arg(long = "loop")]
    pub repeat: bool,

    /// Seconds between cycles in loop mode (overrides config).
    #[arg(long)]
    pub interval: Option<u64>,

    /// Print at most this many opportunities.
    #[arg(long)]
    pub top: Option<usize>,

    /// Print each cycle's report as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl ScanArgs {
    /// Applies command-line overrides on top of a loaded configuration.
    fn apply(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(min) = self.min_profit {
            config.scanner.min_profit_percentage = min;
        }
        if let Some(max) = self.max_volume {
            config.scanner.max_trade_volume = max;
        }
        if !self.exchanges.is_empty() {
            config.exchanges.enabled.clone_from(&self.exchanges);
        }
        if let Some(secs) = self.interval {
            config.scanner.update_interval_secs = secs;
        }
        config.validate().context("invalid command-line override")?;
        Ok(())
    }
}

/// Runs the scanner.
pub async fn run(args: ScanArgs) -> Result<()> {
    let mut config = super::load_config(&args.config)?;
    args.apply(&mut config)?;

    let client = super::http_client(&config)?;
    let ranker = match args.top {
        Some(n) => ResultsRanker::new().with_limit(n),
        None => ResultsRanker::new(),
    };
    let pipeline = ScanPipeline::new(Arc::new(client), &config).with_ranker(ranker);
    let interval = Duration::from_secs(config.scanner.update_interval_secs);

    info!(
        exchanges = ?pipeline.exchanges(),
        min_profit = config.scanner.min_profit_percentage,
        max_volume = config.scanner.max_trade_volume,
        looping = args.repeat,
        "Starting spread scan"
    );

    let shutdown = Arc::new(Notify::new());
    if args.repeat {
        let on_ctrl_c = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, stopping...");
                on_ctrl_c.notify_one();
            }
        });
    }

    let mut cycle: u64 = 0;
    loop {
        cycle += 1;
        let report = tokio::select! {
            report = pipeline.run_cycle() => report,
            () = shutdown.notified() => break,
        };
        print_report(cycle, &report, args.json)?;

        if !args.repeat {
            break;
        }

        info!(seconds = interval.as_secs(), "Waiting for next cycle");
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = shutdown.notified() => break,
        }
    }

    info!(cycles = cycle, "Scan finished");
    Ok(())
}

fn print_report(cycle: u64, report: &ScanReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!("{}", render::summary_line(cycle, &report.summary));
        println!("{}", render::opportunities_table(&report.opportunities));
    }
    Ok(())
}
