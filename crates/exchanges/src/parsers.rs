//! Response parsers for ticker, kline and order-book endpoints.
//!
//! Each exchange has its own envelope and field names. Ticker rows are
//! deserialised into raw per-exchange structs and converted into
//! [`PriceSnapshot`]s; kline rows and book levels are positional arrays, so
//! they are read from a [`serde_json::Value`].

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use spread_scan_core::{BookLevel, ExchangeId, FetchError, OrderBook, PriceSnapshot, TickerMap};
use std::str::FromStr;
use tracing::debug;

use crate::symbols::normalize;

// =============================================================================
// Numeric Helpers
// =============================================================================

/// Reads a decimal from a JSON string or number. Exchanges mix both.
#[must_use]
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}

/// Missing, null, empty or malformed values read as zero.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(decimal_from_value)
        .unwrap_or(Decimal::ZERO))
}

// =============================================================================
// Raw Ticker Types
// =============================================================================

/// Common shape every raw ticker converts into.
struct RawQuote {
    symbol: String,
    bid: Decimal,
    ask: Decimal,
    bid_volume: Decimal,
    ask_volume: Decimal,
}

/// Binance and MEXC `bookTicker` row.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBookTicker {
    symbol: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    bid_price: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    bid_qty: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    ask_price: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    ask_qty: Decimal,
}

impl From<RawBookTicker> for RawQuote {
    fn from(raw: RawBookTicker) -> Self {
        Self {
            symbol: raw.symbol,
            bid: raw.bid_price,
            ask: raw.ask_price,
            bid_volume: raw.bid_qty,
            ask_volume: raw.ask_qty,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawBitgetTicker {
    symbol: String,
    #[serde(rename = "buyOne", default, deserialize_with = "lenient_decimal")]
    bid: Decimal,
    #[serde(rename = "sellOne", default, deserialize_with = "lenient_decimal")]
    ask: Decimal,
    #[serde(rename = "bidSz", default, deserialize_with = "lenient_decimal")]
    bid_size: Decimal,
    #[serde(rename = "askSz", default, deserialize_with = "lenient_decimal")]
    ask_size: Decimal,
}

impl From<RawBitgetTicker> for RawQuote {
    fn from(raw: RawBitgetTicker) -> Self {
        Self {
            symbol: raw.symbol,
            bid: raw.bid,
            ask: raw.ask,
            bid_volume: raw.bid_size,
            ask_volume: raw.ask_size,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHtxTicker {
    symbol: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    bid: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    bid_size: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    ask: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    ask_size: Decimal,
}

impl From<RawHtxTicker> for RawQuote {
    fn from(raw: RawHtxTicker) -> Self {
        Self {
            symbol: raw.symbol,
            bid: raw.bid,
            ask: raw.ask,
            bid_volume: raw.bid_size,
            ask_volume: raw.ask_size,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOkxTicker {
    inst_id: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    bid_px: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    bid_sz: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    ask_px: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    ask_sz: Decimal,
}

impl From<RawOkxTicker> for RawQuote {
    fn from(raw: RawOkxTicker) -> Self {
        Self {
            symbol: raw.inst_id,
            bid: raw.bid_px,
            ask: raw.ask_px,
            bid_volume: raw.bid_sz,
            ask_volume: raw.ask_sz,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawKuCoinTicker {
    symbol: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    buy: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    sell: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    best_bid_size: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    best_ask_size: Decimal,
}

impl From<RawKuCoinTicker> for RawQuote {
    fn from(raw: RawKuCoinTicker) -> Self {
        Self {
            symbol: raw.symbol,
            bid: raw.buy,
            ask: raw.sell,
            bid_volume: raw.best_bid_size,
            ask_volume: raw.best_ask_size,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBybitTicker {
    symbol: String,
    #[serde(rename = "bid1Price", default, deserialize_with = "lenient_decimal")]
    bid_price: Decimal,
    #[serde(rename = "bid1Size", default, deserialize_with = "lenient_decimal")]
    bid_size: Decimal,
    #[serde(rename = "ask1Price", default, deserialize_with = "lenient_decimal")]
    ask_price: Decimal,
    #[serde(rename = "ask1Size", default, deserialize_with = "lenient_decimal")]
    ask_size: Decimal,
}

impl From<RawBybitTicker> for RawQuote {
    fn from(raw: RawBybitTicker) -> Self {
        Self {
            symbol: raw.symbol,
            bid: raw.bid_price,
            ask: raw.ask_price,
            bid_volume: raw.bid_size,
            ask_volume: raw.ask_size,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawGateTicker {
    currency_pair: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    highest_bid: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    lowest_ask: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    highest_size: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    lowest_size: Decimal,
}

impl From<RawGateTicker> for RawQuote {
    fn from(raw: RawGateTicker) -> Self {
        Self {
            symbol: raw.currency_pair,
            bid: raw.highest_bid,
            ask: raw.lowest_ask,
            bid_volume: raw.highest_size,
            ask_volume: raw.lowest_size,
        }
    }
}

// =============================================================================
// Envelopes
// =============================================================================

/// Rejects bodies that carry an exchange-level error despite HTTP 200.
///
/// # Errors
///
/// Returns [`FetchError::Api`] with the exchange's own code and message.
pub fn check_envelope(exchange: ExchangeId, body: &Value) -> Result<(), FetchError> {
    let text = |key: &str| body.get(key).map(value_text);
    let failure = match exchange {
        ExchangeId::Bitget => text("code").filter(|c| c != "00000").map(|c| (c, text("msg"))),
        ExchangeId::Htx => text("status")
            .filter(|s| s != "ok")
            .map(|s| (s, text("err-msg"))),
        ExchangeId::Okx => text("code").filter(|c| c != "0").map(|c| (c, text("msg"))),
        ExchangeId::KuCoin => text("code").filter(|c| c != "200000").map(|c| (c, text("msg"))),
        ExchangeId::Bybit => text("retCode").filter(|c| c != "0").map(|c| (c, text("retMsg"))),
        ExchangeId::Binance | ExchangeId::Mexc => {
            if body.is_object() {
                text("code").map(|c| (c, text("msg")))
            } else {
                None
            }
        }
        ExchangeId::GateIo => {
            if body.is_object() {
                text("label").map(|c| (c, text("message")))
            } else {
                None
            }
        }
    };

    match failure {
        Some((code, message)) => Err(FetchError::api(
            200,
            format!("{exchange} error {code}: {}", message.unwrap_or_default()),
        )),
        None => Ok(()),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pointer<'a>(body: &'a Value, path: &str) -> Result<&'a Value, FetchError> {
    body.pointer(path)
        .ok_or_else(|| FetchError::Parse(format!("missing field {path}")))
}

fn rows<T: DeserializeOwned>(value: &Value) -> Result<Vec<T>, FetchError> {
    serde_json::from_value(value.clone()).map_err(|e| FetchError::Parse(e.to_string()))
}

// =============================================================================
// Tickers
// =============================================================================

/// Parses a ticker response into quotes keyed by normalised symbol.
///
/// # Errors
///
/// Returns [`FetchError::Api`] for an error envelope and
/// [`FetchError::Parse`] if the expected list is missing or malformed.
pub fn parse_tickers(
    exchange: ExchangeId,
    body: &Value,
    timestamp: DateTime<Utc>,
) -> Result<TickerMap, FetchError> {
    check_envelope(exchange, body)?;

    let quotes: Vec<RawQuote> = match exchange {
        ExchangeId::Binance | ExchangeId::Mexc => into_quotes::<RawBookTicker>(body)?,
        ExchangeId::Bitget => into_quotes::<RawBitgetTicker>(pointer(body, "/data")?)?,
        ExchangeId::Htx => into_quotes::<RawHtxTicker>(pointer(body, "/data")?)?,
        ExchangeId::Okx => into_quotes::<RawOkxTicker>(pointer(body, "/data")?)?,
        ExchangeId::KuCoin => into_quotes::<RawKuCoinTicker>(pointer(body, "/data/ticker")?)?,
        ExchangeId::Bybit => into_quotes::<RawBybitTicker>(pointer(body, "/result/list")?)?,
        ExchangeId::GateIo => into_quotes::<RawGateTicker>(body)?,
    };

    let tickers: TickerMap = quotes
        .into_iter()
        .map(|q| {
            let symbol = normalize(&q.symbol);
            let snapshot = PriceSnapshot {
                exchange,
                symbol: symbol.clone(),
                bid: q.bid,
                ask: q.ask,
                bid_volume: q.bid_volume,
                ask_volume: q.ask_volume,
                timestamp,
            };
            (symbol, snapshot)
        })
        .collect();

    debug!(exchange = %exchange, symbols = tickers.len(), "Parsed tickers");
    Ok(tickers)
}

fn into_quotes<T>(value: &Value) -> Result<Vec<RawQuote>, FetchError>
where
    T: DeserializeOwned + Into<RawQuote>,
{
    Ok(rows::<T>(value)?.into_iter().map(Into::into).collect())
}

// =============================================================================
// Klines
// =============================================================================

/// Where the close price and open time sit in one exchange's kline rows.
struct KlineLayout {
    list: &'static str,
    close_index: usize,
    millis: bool,
}

fn kline_layout(exchange: ExchangeId) -> KlineLayout {
    match exchange {
        ExchangeId::Binance | ExchangeId::Mexc => KlineLayout { list: "", close_index: 4, millis: true },
        ExchangeId::Bitget | ExchangeId::Okx => KlineLayout { list: "/data", close_index: 4, millis: true },
        ExchangeId::Bybit => KlineLayout { list: "/result/list", close_index: 4, millis: true },
        ExchangeId::KuCoin => KlineLayout { list: "/data", close_index: 2, millis: false },
        ExchangeId::GateIo => KlineLayout { list: "", close_index: 2, millis: false },
        // Rows are objects keyed by name; the index is unused.
        ExchangeId::Htx => KlineLayout { list: "/data", close_index: 0, millis: false },
    }
}

/// Parses a kline response into close-price snapshots, oldest first.
///
/// Rows with a missing or non-positive close are skipped. Both sides of each
/// snapshot carry the close price and volumes are zero.
///
/// # Errors
///
/// Returns [`FetchError::Api`] for an error envelope and
/// [`FetchError::Parse`] if the kline list is missing.
pub fn parse_klines(
    exchange: ExchangeId,
    symbol: &str,
    body: &Value,
) -> Result<Vec<PriceSnapshot>, FetchError> {
    check_envelope(exchange, body)?;

    let layout = kline_layout(exchange);
    let list = pointer(body, layout.list)?
        .as_array()
        .ok_or_else(|| FetchError::Parse(format!("{exchange} klines are not a list")))?;

    let mut points: Vec<(DateTime<Utc>, Decimal)> = list
        .iter()
        .filter_map(|row| match exchange {
            ExchangeId::Htx => Some((row.get("id")?, row.get("close")?)),
            _ => Some((row.get(0)?, row.get(layout.close_index)?)),
        })
        .filter_map(|(ts, close)| {
            let ts = decimal_from_value(ts)?.trunc().to_i64()?;
            let time = if layout.millis {
                DateTime::from_timestamp_millis(ts)?
            } else {
                DateTime::from_timestamp(ts, 0)?
            };
            let close = decimal_from_value(close).filter(|c| *c > Decimal::ZERO)?;
            Some((time, close))
        })
        .collect();

    let skipped = list.len() - points.len();
    if skipped > 0 {
        debug!(exchange = %exchange, symbol, skipped, "Skipped malformed kline rows");
    }

    points.sort_by_key(|(time, _)| *time);
    points.dedup_by_key(|(time, _)| *time);

    Ok(points
        .into_iter()
        .map(|(timestamp, close)| PriceSnapshot {
            exchange,
            symbol: symbol.to_string(),
            bid: close,
            ask: close,
            bid_volume: Decimal::ZERO,
            ask_volume: Decimal::ZERO,
            timestamp,
        })
        .collect())
}

// =============================================================================
// Order Books
// =============================================================================

/// Pointers to the bid and ask arrays in one exchange's depth response.
fn book_sides(exchange: ExchangeId) -> (&'static str, &'static str) {
    match exchange {
        ExchangeId::Binance | ExchangeId::Mexc | ExchangeId::GateIo => ("/bids", "/asks"),
        ExchangeId::Bitget | ExchangeId::KuCoin => ("/data/bids", "/data/asks"),
        ExchangeId::Htx => ("/tick/bids", "/tick/asks"),
        ExchangeId::Okx => ("/data/0/bids", "/data/0/asks"),
        ExchangeId::Bybit => ("/result/b", "/result/a"),
    }
}

/// Parses a depth response into an [`OrderBook`].
///
/// Every venue encodes a level as `[price, quantity, ...]`; extra fields are
/// ignored and malformed or non-positive levels are dropped.
///
/// # Errors
///
/// Returns [`FetchError::Api`] for an error envelope and
/// [`FetchError::Parse`] if either side is missing.
pub fn parse_order_book(
    exchange: ExchangeId,
    symbol: &str,
    body: &Value,
    timestamp: DateTime<Utc>,
) -> Result<OrderBook, FetchError> {
    check_envelope(exchange, body)?;

    let (bids_path, asks_path) = book_sides(exchange);
    let bids = book_levels(exchange, pointer(body, bids_path)?)?;
    let asks = book_levels(exchange, pointer(body, asks_path)?)?;

    let book = OrderBook::new(exchange, symbol, bids, asks, timestamp);
    debug!(
        exchange = %exchange,
        symbol,
        bids = book.bids.len(),
        asks = book.asks.len(),
        "Parsed order book"
    );
    Ok(book)
}

fn book_levels(exchange: ExchangeId, side: &Value) -> Result<Vec<BookLevel>, FetchError> {
    let rows = side
        .as_array()
        .ok_or_else(|| FetchError::Parse(format!("{exchange} book side is not a list")))?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let price = decimal_from_value(row.get(0)?)?;
            let quantity = decimal_from_value(row.get(1)?)?;
            Some(BookLevel::new(price, quantity))
        })
        .collect())
}
