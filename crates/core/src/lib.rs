//! Core types, error taxonomy, exchange trait and configuration shared by
//! every crate of the spread scanner.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{
    AppConfig, CacheConfig, DepthConfig, ExchangesConfig, RiskConfig, ScannerConfig,
    MAX_CONCURRENT_REQUESTS,
};
pub use config_loader::ConfigLoader;
pub use error::{ConfigError, FetchError};
pub use traits::ExchangeClient;
pub use types::{symbol_set, BookLevel, ExchangeId, OrderBook, PriceSnapshot, SymbolSet, TickerMap};
