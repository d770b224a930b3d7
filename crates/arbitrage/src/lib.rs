//! Cross-exchange spread scanning.
//!
//! A scan cycle runs three pure stages over a fan-in snapshot of exchange
//! tickers:
//!
//! 1. [`SpreadCalculator`] prices every ordered exchange pair per common symbol
//! 2. [`RiskValidator`] drops candidates whose buy or sell leg history fails
//!    risk limits
//! 3. [`ResultsRanker`] orders survivors deterministically
//!
//! [`ScanPipeline`] wires them to an [`ExchangeClient`](spread_scan_core::ExchangeClient)
//! through rate-limited caches, then replaces each survivor's top-of-book
//! depth with [`market_depth`] from both legs' order books.

pub mod depth;
pub mod detector;
pub mod fees;
pub mod pipeline;
pub mod ranker;
pub mod resolver;
pub mod types;
pub mod validator;

pub use depth::{ask_depth, bid_depth, market_depth, DEFAULT_DEPTH_BAND};
pub use detector::{DetectorConfig, SpreadCalculator};
pub use fees::FeeSchedule;
pub use pipeline::{ScanPipeline, ScanReport, ScanSummary};
pub use ranker::ResultsRanker;
pub use resolver::{CommonCoinResolver, CommonSymbols};
pub use types::{rank_order, SpreadCandidate, ValidatedCandidate};
pub use validator::{validate, RiskThresholds, RiskValidator};
