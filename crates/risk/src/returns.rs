//! Log-return series built from a price history window.

use rust_decimal::prelude::ToPrimitive;
use spread_scan_core::PriceSnapshot;
use thiserror::Error;

/// Minimum number of prices needed to form a single return.
pub const MIN_PRICES: usize = 2;

/// Reasons a price history cannot be turned into returns.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RiskError {
    #[error("insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid price {value} at index {index}")]
    InvalidPrice { index: usize, value: f64 },
}

/// Ordered log-returns `r_t = ln(P_t / P_{t-1})`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReturnSeries {
    returns: Vec<f64>,
}

impl ReturnSeries {
    /// Builds a series from prices ordered oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InsufficientData`] for fewer than two prices and
    /// [`RiskError::InvalidPrice`] for any non-positive or non-finite price.
    pub fn from_prices(prices: &[f64]) -> Result<Self, RiskError> {
        if prices.len() < MIN_PRICES {
            return Err(RiskError::InsufficientData {
                required: MIN_PRICES,
                actual: prices.len(),
            });
        }
        if let Some((index, &value)) = prices
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p <= 0.0)
        {
            return Err(RiskError::InvalidPrice { index, value });
        }

        let returns = prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
        Ok(Self { returns })
    }

    /// Builds a series from snapshot mid prices, oldest first.
    ///
    /// # Errors
    ///
    /// Same as [`ReturnSeries::from_prices`]; a snapshot with no positive
    /// side is reported as an invalid price.
    pub fn from_snapshots(history: &[PriceSnapshot]) -> Result<Self, RiskError> {
        let prices: Vec<f64> = history
            .iter()
            .map(|s| s.mid().and_then(|p| p.to_f64()).unwrap_or(f64::NAN))
            .collect();
        Self::from_prices(&prices)
    }

    /// Wraps already computed log-returns.
    #[must_use]
    pub fn from_returns(returns: Vec<f64>) -> Self {
        Self { returns }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.returns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Normalised price path `exp(cumsum(r))`, starting at 1.0.
    ///
    /// Has one more element than the series.
    #[must_use]
    pub fn price_path(&self) -> Vec<f64> {
        let mut path = Vec::with_capacity(self.returns.len() + 1);
        let mut log_level = 0.0;
        path.push(1.0);
        for r in &self.returns {
            log_level += r;
            path.push(log_level.exp());
        }
        path
    }
}
