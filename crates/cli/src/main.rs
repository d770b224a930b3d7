use clap::{Parser, Subcommand};

mod commands;
mod render;

use commands::{MetricsArgs, ScanArgs};

#[derive(Parser)]
#[command(name = "spread-scan")]
#[command(about = "Cross-exchange crypto spread scanner with risk filtering", long_about = None)]
struct Cli {
    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true, env = "SPREAD_SCAN_LOG_FILE")]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan enabled exchanges for spreads and print ranked opportunities
    Scan(ScanArgs),
    /// Compute risk metrics for one symbol on one exchange
    Metrics(MetricsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .init();
        }
    }

    match cli.command {
        Commands::Scan(args) => commands::scan::run(args).await?,
        Commands::Metrics(args) => commands::metrics::run(args).await?,
    }

    Ok(())
}
