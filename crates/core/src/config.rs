use crate::error::ConfigError;
use crate::types::ExchangeId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound accepted for `cache.max_concurrent_requests`.
pub const MAX_CONCURRENT_REQUESTS: usize = 1024;

/// Upper bound accepted for `cache.max_retries`.
const MAX_RETRIES: u32 = 10;

/// Upper bound accepted for `depth.levels`.
const MAX_DEPTH_LEVELS: usize = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    pub cache: CacheConfig,
    pub risk: RiskConfig,
    pub depth: DepthConfig,
    pub exchanges: ExchangesConfig,
}

/// Stage-1 spread detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Minimum profit percentage to keep a candidate.
    pub min_profit_percentage: f64,
    /// Spreads above this are treated as unrelated assets sharing a ticker.
    pub max_profit_percentage: Option<f64>,
    /// Cap on executable volume per candidate (base units).
    pub max_trade_volume: f64,
    /// Liquidity floor; candidates with less executable volume are dropped.
    pub min_trade_volume: f64,
    /// Fee charged on the buy leg, as a fraction.
    pub taker_fee: f64,
    /// Fee charged on the sell leg, as a fraction.
    pub maker_fee: f64,
    /// Number of hourly samples requested for risk metrics.
    pub history_window: usize,
    /// Pause between cycles in loop mode.
    pub update_interval_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            min_profit_percentage: 0.5,
            max_profit_percentage: Some(75.0),
            max_trade_volume: 1000.0,
            min_trade_volume: 0.0,
            taker_fee: 0.0,
            maker_fee: 0.0,
            history_window: 240,
            update_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub expiration_secs: u64,
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
    /// Extra attempts after a retryable fetch failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub retry_delay_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiration_secs: 60,
            max_concurrent_requests: 10,
            request_timeout_secs: 15,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Stage-2 thresholds and estimator conventions.
///
/// A threshold set to `None` is not enforced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub min_sharpe: Option<f64>,
    pub max_volatility: Option<f64>,
    /// Minimum of `profit_pct / volatility`.
    pub min_reward_risk: Option<f64>,
    /// Maximum drawdown as a positive fraction.
    pub max_drawdown: Option<f64>,
    /// Floor for the 95% VaR (a negative log-return).
    pub min_var: Option<f64>,
    /// Drop candidates whose metrics could not be computed.
    pub reject_undefined: bool,
    pub risk_free_rate: f64,
    /// Samples per year used to annualise volatility and Calmar.
    pub annualization_factor: f64,
    /// Periods per year used to annualise Sharpe and Sortino.
    pub sharpe_periods: f64,
    pub omega_target: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            min_sharpe: Some(-2.0),
            max_volatility: Some(1.2),
            min_reward_risk: None,
            max_drawdown: Some(0.6),
            min_var: Some(-0.05),
            reject_undefined: false,
            risk_free_rate: 0.0,
            annualization_factor: 240.0,
            sharpe_periods: 252.0,
            omega_target: 0.0,
        }
    }
}

/// Order-book depth annotation of validated candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    /// Fetch order books; when off, depth is the top-of-book size.
    pub enabled: bool,
    /// Price levels requested per side.
    pub levels: usize,
    /// Band around the best price counted as depth, as a fraction.
    pub band: f64,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            levels: 100,
            band: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangesConfig {
    pub enabled: Vec<ExchangeId>,
    pub user_agent: String,
}

impl Default for ExchangesConfig {
    fn default() -> Self {
        Self {
            enabled: ExchangeId::ALL.to_vec(),
            user_agent: format!("spread-scan/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl AppConfig {
    /// Checks every threshold and limit for a usable value.
    ///
    /// # Errors
    ///
    /// Returns the first offending field as [`ConfigError::InvalidValue`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scanner = &self.scanner;
        non_negative("scanner.min_profit_percentage", scanner.min_profit_percentage)?;
        decimal("scanner.min_profit_percentage", scanner.min_profit_percentage)?;
        if let Some(max) = scanner.max_profit_percentage {
            non_negative("scanner.max_profit_percentage", max)?;
            decimal("scanner.max_profit_percentage", max)?;
            if max < scanner.min_profit_percentage {
                return Err(ConfigError::invalid(
                    "scanner.max_profit_percentage",
                    "must not be below min_profit_percentage",
                ));
            }
        }
        positive("scanner.max_trade_volume", scanner.max_trade_volume)?;
        decimal("scanner.max_trade_volume", scanner.max_trade_volume)?;
        non_negative("scanner.min_trade_volume", scanner.min_trade_volume)?;
        if scanner.min_trade_volume > scanner.max_trade_volume {
            return Err(ConfigError::invalid(
                "scanner.min_trade_volume",
                "must not exceed max_trade_volume",
            ));
        }
        fraction("scanner.taker_fee", scanner.taker_fee)?;
        fraction("scanner.maker_fee", scanner.maker_fee)?;
        if scanner.history_window < 2 {
            return Err(ConfigError::invalid(
                "scanner.history_window",
                "must be at least 2 samples",
            ));
        }

        let cache = &self.cache;
        if cache.max_concurrent_requests == 0 {
            return Err(ConfigError::invalid(
                "cache.max_concurrent_requests",
                "must be at least 1",
            ));
        }
        if cache.max_concurrent_requests > MAX_CONCURRENT_REQUESTS {
            return Err(ConfigError::invalid(
                "cache.max_concurrent_requests",
                format!("must not exceed {MAX_CONCURRENT_REQUESTS}"),
            ));
        }
        if cache.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "cache.request_timeout_secs",
                "must be at least 1 second",
            ));
        }
        if cache.max_retries > MAX_RETRIES {
            return Err(ConfigError::invalid(
                "cache.max_retries",
                format!("must not exceed {MAX_RETRIES}"),
            ));
        }

        let depth = &self.depth;
        if depth.levels == 0 || depth.levels > MAX_DEPTH_LEVELS {
            return Err(ConfigError::invalid(
                "depth.levels",
                format!("must be between 1 and {MAX_DEPTH_LEVELS}"),
            ));
        }
        fraction("depth.band", depth.band)?;

        let risk = &self.risk;
        if let Some(v) = risk.min_sharpe {
            finite("risk.min_sharpe", v)?;
        }
        if let Some(v) = risk.max_volatility {
            non_negative("risk.max_volatility", v)?;
        }
        if let Some(v) = risk.min_reward_risk {
            finite("risk.min_reward_risk", v)?;
        }
        if let Some(v) = risk.max_drawdown {
            fraction("risk.max_drawdown", v)?;
        }
        if let Some(v) = risk.min_var {
            finite("risk.min_var", v)?;
        }
        finite("risk.risk_free_rate", risk.risk_free_rate)?;
        positive("risk.annualization_factor", risk.annualization_factor)?;
        positive("risk.sharpe_periods", risk.sharpe_periods)?;
        finite("risk.omega_target", risk.omega_target)?;

        if self.exchanges.enabled.is_empty() {
            return Err(ConfigError::invalid(
                "exchanges.enabled",
                "at least one exchange is required",
            ));
        }

        Ok(())
    }
}

fn finite(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is not finite")))
    }
}

/// Rejects values too large for a `Decimal`.
fn decimal(field: &str, value: f64) -> Result<(), ConfigError> {
    Decimal::try_from(value)
        .map(|_| ())
        .map_err(|_| ConfigError::invalid(field, format!("{value} is out of decimal range")))
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::invalid(field, format!("{value} is negative")));
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigError::invalid(field, format!("{value} must be positive")));
    }
    Ok(())
}

fn fraction(field: &str, value: f64) -> Result<(), ConfigError> {
    non_negative(field, value)?;
    if value >= 1.0 {
        return Err(ConfigError::invalid(field, format!("{value} must be below 1")));
    }
    Ok(())
}
