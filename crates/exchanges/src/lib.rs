//! Public spot market data for Binance, Bitget, HTX, OKX, KuCoin, Bybit,
//! MEXC and Gate.io.
//!
//! [`HttpExchangeClient`] implements [`spread_scan_core::ExchangeClient`]:
//! top-of-book tickers for every listed symbol, hourly close history for one
//! symbol and its order book. Symbols are normalised to `BASEQUOTE` upper
//! case.

pub mod client;
pub mod parsers;
pub mod symbols;

pub use client::{
    default_base_url, max_book_levels, HttpClientConfig, HttpExchangeClient, MAX_KLINE_LIMIT,
};
pub use parsers::{check_envelope, parse_klines, parse_order_book, parse_tickers};
pub use symbols::{exchange_symbol, normalize, split_symbol, trade_url, QUOTE_CURRENCIES};
