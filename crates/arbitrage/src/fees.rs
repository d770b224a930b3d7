//! Trading fees folded into candidate cost and revenue.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Typical spot taker fee (0.2%).
pub const STANDARD_TAKER_FEE: Decimal = dec!(0.002);

/// Typical spot maker fee (0.1%).
pub const STANDARD_MAKER_FEE: Decimal = dec!(0.001);

/// Fee rates applied to the two legs of a spread.
///
/// The buy leg crosses the ask and pays `taker_fee`; the sell leg is charged
/// `maker_fee`. Rates are fractions, e.g. `0.002` for 0.2%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub taker_fee: Decimal,
    pub maker_fee: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::zero()
    }
}

impl FeeSchedule {
    #[must_use]
    pub fn new(taker_fee: Decimal, maker_fee: Decimal) -> Self {
        Self {
            taker_fee,
            maker_fee,
        }
    }

    /// No fees: cost and revenue are raw notionals.
    #[must_use]
    pub fn zero() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO)
    }

    /// Common retail spot tier.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(STANDARD_TAKER_FEE, STANDARD_MAKER_FEE)
    }

    /// Buy notional plus the taker fee.
    #[must_use]
    pub fn buy_cost(&self, volume: Decimal, ask: Decimal) -> Decimal {
        volume * ask * (Decimal::ONE + self.taker_fee)
    }

    /// Sell notional minus the maker fee.
    #[must_use]
    pub fn sell_revenue(&self, volume: Decimal, bid: Decimal) -> Decimal {
        volume * bid * (Decimal::ONE - self.maker_fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_fees_are_raw_notional() {
        let fees = FeeSchedule::zero();
        assert_eq!(fees.buy_cost(dec!(50), dec!(101)), dec!(5050));
        assert_eq!(fees.sell_revenue(dec!(50), dec!(105)), dec!(5250));
    }

    #[test]
    fn test_standard_fees() {
        let fees = FeeSchedule::standard();
        assert_eq!(fees.buy_cost(dec!(10), dec!(100)), dec!(1002));
        assert_eq!(fees.sell_revenue(dec!(10), dec!(100)), dec!(999));
    }
}
