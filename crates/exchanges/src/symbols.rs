//! Symbol normalisation, per-exchange symbol formats and trade-page URLs.
//!
//! Internally every symbol is `BASEQUOTE` in upper case, e.g. `BTCUSDT`.

use spread_scan_core::ExchangeId;

/// Quote assets recognised when splitting a normalised symbol, longest first
/// so that `USDT` wins over `USD`.
pub const QUOTE_CURRENCIES: [&str; 20] = [
    "USDT", "USDC", "BUSD", "USD", "EUR", "BTC", "ETH", "DAI", "GBP", "AUD", "JPY", "KRW",
    "RUB", "TRY", "CNY", "SGD", "HKD", "CAD", "CHF", "NZD",
];

/// Strips separators and upper-cases an exchange-native symbol.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '-' | '_' | '/'))
        .flat_map(char::to_uppercase)
        .collect()
}

/// Splits a normalised symbol into `(base, quote)`.
#[must_use]
pub fn split_symbol(symbol: &str) -> Option<(&str, &str)> {
    QUOTE_CURRENCIES.iter().find_map(|quote| {
        symbol
            .strip_suffix(quote)
            .filter(|base| !base.is_empty())
            .map(|base| (base, *quote))
    })
}

/// Converts a normalised symbol to the form an exchange's market-data API
/// expects. Symbols with an unknown quote are passed through unchanged.
#[must_use]
pub fn exchange_symbol(exchange: ExchangeId, symbol: &str) -> String {
    let joined = |sep: &str| match split_symbol(symbol) {
        Some((base, quote)) => format!("{base}{sep}{quote}"),
        None => symbol.to_string(),
    };
    match exchange {
        ExchangeId::Binance | ExchangeId::Bitget | ExchangeId::Bybit | ExchangeId::Mexc => {
            symbol.to_string()
        }
        ExchangeId::Htx => symbol.to_ascii_lowercase(),
        ExchangeId::Okx | ExchangeId::KuCoin => joined("-"),
        ExchangeId::GateIo => joined("_"),
    }
}

/// Spot trading page for `symbol` on `exchange`.
#[must_use]
pub fn trade_url(exchange: ExchangeId, symbol: &str) -> Option<String> {
    let (base, quote) = split_symbol(symbol)?;
    let url = match exchange {
        ExchangeId::Binance => format!("https://www.binance.com/en/trade/{base}_{quote}?type=spot"),
        ExchangeId::Bitget => format!("https://www.bitget.com/spot/{base}{quote}?type=spot"),
        ExchangeId::Htx => format!(
            "https://www.htx.com/trade/{}_{}?type=spot",
            base.to_ascii_lowercase(),
            quote.to_ascii_lowercase()
        ),
        ExchangeId::Okx => format!(
            "https://www.okx.com/en/trade-spot/{}-{}",
            base.to_ascii_lowercase(),
            quote.to_ascii_lowercase()
        ),
        ExchangeId::KuCoin => format!("https://www.kucoin.com/en/trade/{base}-{quote}"),
        ExchangeId::Bybit => format!("https://www.bybit.com/en/trade/spot/{base}/{quote}"),
        ExchangeId::Mexc => format!("https://www.mexc.com/en/exchange/{base}_{quote}"),
        ExchangeId::GateIo => format!("https://www.gate.io/en/trade/{base}_{quote}"),
    };
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("BTC-USDT"), "BTCUSDT");
        assert_eq!(normalize("eth_btc"), "ETHBTC");
        assert_eq!(normalize("btcusdt"), "BTCUSDT");
    }

    #[test]
    fn test_split_prefers_longest_quote() {
        assert_eq!(split_symbol("BTCUSDT"), Some(("BTC", "USDT")));
        assert_eq!(split_symbol("ETHBUSD"), Some(("ETH", "BUSD")));
        assert_eq!(split_symbol("SOLUSD"), Some(("SOL", "USD")));
        assert_eq!(split_symbol("USDT"), None);
        assert_eq!(split_symbol("FOOBAR"), None);
    }

    #[test]
    fn test_exchange_symbol_formats() {
        assert_eq!(exchange_symbol(ExchangeId::Binance, "BTCUSDT"), "BTCUSDT");
        assert_eq!(exchange_symbol(ExchangeId::Htx, "BTCUSDT"), "btcusdt");
        assert_eq!(exchange_symbol(ExchangeId::Okx, "BTCUSDT"), "BTC-USDT");
        assert_eq!(exchange_symbol(ExchangeId::KuCoin, "ETHBTC"), "ETH-BTC");
        assert_eq!(exchange_symbol(ExchangeId::GateIo, "BTCUSDT"), "BTC_USDT");
        assert_eq!(exchange_symbol(ExchangeId::GateIo, "WEIRD"), "WEIRD");
    }

    #[test]
    fn test_trade_urls() {
        assert_eq!(
            trade_url(ExchangeId::Binance, "BTCUSDT").unwrap(),
            "https://www.binance.com/en/trade/BTC_USDT?type=spot"
        );
        assert_eq!(
            trade_url(ExchangeId::Okx, "BTCUSDT").unwrap(),
            "https://www.okx.com/en/trade-spot/btc-usdt"
        );
        assert_eq!(
            trade_url(ExchangeId::Bybit, "ETHUSDC").unwrap(),
            "https://www.bybit.com/en/trade/spot/ETH/USDC"
        );
        assert!(trade_url(ExchangeId::Mexc, "NOQUOTE").is_none());
    }
}
