//! Order-book depth around the best prices.
//!
//! Depth is the base quantity resting within a band of the best price: asks
//! up to `best_ask * (1 + band)` on the buy book and bids down to
//! `best_bid * (1 - band)` on the sell book. A pair's depth is the smaller of
//! the two, since a trade can only fill what both sides offer.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use spread_scan_core::OrderBook;

/// Default band around the best price (1%).
pub const DEFAULT_DEPTH_BAND: Decimal = dec!(0.01);

/// Ask quantity priced within `band` above the best ask.
#[must_use]
pub fn ask_depth(book: &OrderBook, band: Decimal) -> Decimal {
    let Some(best) = book.best_ask() else {
        return Decimal::ZERO;
    };
    let limit = best * (Decimal::ONE + band);
    book.asks
        .iter()
        .take_while(|l| l.price <= limit)
        .map(|l| l.quantity)
        .sum()
}

/// Bid quantity priced within `band` below the best bid.
#[must_use]
pub fn bid_depth(book: &OrderBook, band: Decimal) -> Decimal {
    let Some(best) = book.best_bid() else {
        return Decimal::ZERO;
    };
    let limit = best * (Decimal::ONE - band);
    book.bids
        .iter()
        .take_while(|l| l.price >= limit)
        .map(|l| l.quantity)
        .sum()
}

/// Executable depth for buying on `buy_book` and selling on `sell_book`.
/// Zero if either side is empty.
#[must_use]
pub fn market_depth(buy_book: &OrderBook, sell_book: &OrderBook, band: Decimal) -> Decimal {
    ask_depth(buy_book, band).min(bid_depth(sell_book, band))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use spread_scan_core::{BookLevel, ExchangeId};

    fn book(bids: &[(Decimal, Decimal)], asks: &[(Decimal, Decimal)]) -> OrderBook {
        let levels = |side: &[(Decimal, Decimal)]| -> Vec<BookLevel> {
            side.iter().map(|&(p, q)| BookLevel::new(p, q)).collect()
        };
        OrderBook::new(ExchangeId::Binance, "BTCUSDT", levels(bids), levels(asks), Utc::now())
    }

    #[test]
    fn test_ask_depth_counts_levels_inside_band() {
        let b = book(
            &[],
            &[
                (dec!(100), dec!(2)),
                (dec!(100.5), dec!(3)),
                (dec!(101), dec!(4)),
                (dec!(101.5), dec!(9)),
            ],
        );
        // limit = 101, inclusive
        assert_eq!(ask_depth(&b, dec!(0.01)), dec!(9));
    }

    #[test]
    fn test_bid_depth_counts_levels_inside_band() {
        let b = book(
            &[(dec!(200), dec!(1)), (dec!(199), dec!(2)), (dec!(197), dec!(50))],
            &[],
        );
        // limit = 198
        assert_eq!(bid_depth(&b, dec!(0.01)), dec!(3));
    }

    #[test]
    fn test_market_depth_is_smaller_side() {
        let buy = book(&[], &[(dec!(100), dec!(5)), (dec!(100.8), dec!(5))]);
        let sell = book(&[(dec!(105), dec!(3)), (dec!(104.5), dec!(4))], &[]);
        assert_eq!(market_depth(&buy, &sell, dec!(0.01)), dec!(7));
    }

    #[test]
    fn test_empty_side_has_zero_depth() {
        let buy = book(&[], &[(dec!(100), dec!(5))]);
        let empty = book(&[], &[]);
        assert_eq!(market_depth(&buy, &empty, dec!(0.01)), Decimal::ZERO);
        assert_eq!(market_depth(&empty, &buy, dec!(0.01)), Decimal::ZERO);
    }
}
