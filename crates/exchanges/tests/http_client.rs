//! HTTP client behaviour against a mock exchange server.

use rust_decimal_macros::dec;
use spread_scan_core::{ExchangeClient, ExchangeId, FetchError};
use spread_scan_exchanges::{HttpClientConfig, HttpExchangeClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(exchange: ExchangeId, server: &MockServer) -> HttpExchangeClient {
    let config = HttpClientConfig::default()
        .with_base_url(exchange, server.uri())
        .with_timeout_secs(5);
    HttpExchangeClient::new(config).unwrap()
}

// ==================== Ticker Tests ====================

#[tokio::test]
async fn test_binance_tickers_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/bookTicker"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"symbol": "BTCUSDT", "bidPrice": "50000", "bidQty": "1.5", "askPrice": "50010", "askQty": "2"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(ExchangeId::Binance, &server);
    let tickers = client.fetch_tickers(ExchangeId::Binance).await.unwrap();

    assert_eq!(tickers["BTCUSDT"].ask, dec!(50010));
    assert_eq!(tickers["BTCUSDT"].bid_volume, dec!(1.5));
}

#[tokio::test]
async fn test_bybit_tickers_query_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v5/market/tickers"))
        .and(query_param("category", "spot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": {"list": [
                {"symbol": "ETHUSDT", "bid1Price": "3000", "bid1Size": "4", "ask1Price": "3001", "ask1Size": "5"}
            ]}
        })))
        .mount(&server)
        .await;

    let client = client_for(ExchangeId::Bybit, &server);
    let tickers = client.fetch_tickers(ExchangeId::Bybit).await.unwrap();
    assert_eq!(tickers["ETHUSDT"].bid, dec!(3000));
}

// ==================== Error Mapping Tests ====================

#[tokio::test]
async fn test_429_maps_to_rate_limit_with_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
        .mount(&server)
        .await;

    let client = client_for(ExchangeId::Okx, &server);
    let err = client.fetch_tickers(ExchangeId::Okx).await.unwrap_err();
    assert_eq!(err, FetchError::rate_limit(12));
}

#[tokio::test]
async fn test_429_without_header_defaults_to_sixty_seconds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = client_for(ExchangeId::GateIo, &server);
    let err = client.fetch_tickers(ExchangeId::GateIo).await.unwrap_err();
    assert_eq!(err, FetchError::rate_limit(60));
}

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = client_for(ExchangeId::KuCoin, &server);
    let err = client.fetch_tickers(ExchangeId::KuCoin).await.unwrap_err();
    assert_eq!(err, FetchError::api(503, "maintenance"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_non_json_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = client_for(ExchangeId::Mexc, &server);
    let err = client.fetch_tickers(ExchangeId::Mexc).await.unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
}

#[tokio::test]
async fn test_slow_exchange_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([]))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = HttpClientConfig::default()
        .with_base_url(ExchangeId::Binance, server.uri())
        .with_timeout_secs(1);
    let client = HttpExchangeClient::new(config).unwrap();
    let err = client.fetch_tickers(ExchangeId::Binance).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout(_)));
}

// ==================== History Tests ====================

#[tokio::test]
async fn test_history_is_trimmed_to_window_and_ordered() {
    let server = MockServer::start().await;
    let rows: Vec<serde_json::Value> = (0..5)
        .rev()
        .map(|i| {
            serde_json::json!([
                (1_700_000_000_000_i64 + i * 3_600_000).to_string(),
                "0", "0", "0",
                format!("{}", 100 + i),
                "0"
            ])
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/api/v5/market/candles"))
        .and(query_param("instId", "BTC-USDT"))
        .and(query_param("bar", "1H"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"code": "0", "msg": "", "data": rows})),
        )
        .mount(&server)
        .await;

    let client = client_for(ExchangeId::Okx, &server);
    let history = client
        .fetch_history(ExchangeId::Okx, "BTCUSDT", 3)
        .await
        .unwrap();

    let closes: Vec<_> = history.iter().map(|s| s.bid).collect();
    assert_eq!(closes, vec![dec!(102), dec!(103), dec!(104)]);
    assert!(history.iter().all(|s| s.symbol == "BTCUSDT"));
}

#[tokio::test]
async fn test_history_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/history/kline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "error",
            "err-code": "invalid-parameter",
            "err-msg": "invalid symbol"
        })))
        .mount(&server)
        .await;

    let client = client_for(ExchangeId::Htx, &server);
    let err = client
        .fetch_history(ExchangeId::Htx, "NOPEUSDT", 10)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Api { .. }));
}

// ==================== Order Book Tests ====================

#[tokio::test]
async fn test_gate_order_book_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/spot/order_book"))
        .and(query_param("currency_pair", "BTC_USDT"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": 1_700_000_000_000_i64,
            "update": 1_700_000_000_000_i64,
            "asks": [["50010", "0.5"], ["50011", "1"]],
            "bids": [["50000", "2"], ["49990", "3"]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(ExchangeId::GateIo, &server);
    let book = client
        .fetch_order_book(ExchangeId::GateIo, "BTCUSDT", 2)
        .await
        .unwrap();

    assert_eq!(book.exchange, ExchangeId::GateIo);
    assert_eq!(book.best_bid(), Some(dec!(50000)));
    assert_eq!(book.best_ask(), Some(dec!(50010)));
    assert_eq!(book.asks.len(), 2);
}

#[tokio::test]
async fn test_htx_order_book_truncated_to_requested_levels() {
    let server = MockServer::start().await;
    let level = |price: f64| serde_json::json!([price, 1.0]);
    let bids: Vec<_> = (0..150).map(|i| level(100.0 - f64::from(i) * 0.01)).collect();
    let asks: Vec<_> = (0..150).map(|i| level(100.5 + f64::from(i) * 0.01)).collect();
    Mock::given(method("GET"))
        .and(path("/market/depth"))
        .and(query_param("symbol", "ethusdt"))
        .and(query_param("type", "step0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "tick": {"bids": bids, "asks": asks}
        })))
        .mount(&server)
        .await;

    let client = client_for(ExchangeId::Htx, &server);
    let book = client
        .fetch_order_book(ExchangeId::Htx, "ETHUSDT", 20)
        .await
        .unwrap();

    assert_eq!(book.bids.len(), 20);
    assert_eq!(book.asks.len(), 20);
    assert_eq!(book.best_bid(), Some(dec!(100)));
}

#[tokio::test]
async fn test_order_book_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v5/market/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "51001",
            "msg": "Instrument ID does not exist",
            "data": []
        })))
        .mount(&server)
        .await;

    let client = client_for(ExchangeId::Okx, &server);
    let err = client
        .fetch_order_book(ExchangeId::Okx, "NOPEUSDT", 100)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Api { .. }));
}
