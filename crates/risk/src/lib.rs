//! Statistical risk metrics for spread candidates.
//!
//! Builds a [`ReturnSeries`] of log-returns from a price history and computes
//! a fixed-field [`RiskMetricsResult`]: volatility, Sharpe, Sortino, VaR,
//! CVaR, max drawdown, Calmar, Omega, Hurst exponent and fractal dimension.

pub mod fractal;
pub mod metrics;
pub mod returns;
pub mod stats;

pub use metrics::{compute, RiskMetricsEngine, RiskMetricsResult};
pub use returns::{ReturnSeries, RiskError};
