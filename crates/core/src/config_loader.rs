use crate::config::AppConfig;
use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

/// Default location of the TOML configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

/// Prefix for nested environment overrides, e.g. `SPREAD_SCAN_CACHE__EXPIRATION_SECS`.
pub const ENV_PREFIX: &str = "SPREAD_SCAN_";

/// Flat variable names accepted for compatibility with existing deployments.
const LEGACY_ENV_KEYS: [(&str, &str); 6] = [
    ("MIN_PROFIT_PERCENTAGE", "scanner.min_profit_percentage"),
    ("MAX_TRADE_VOLUME", "scanner.max_trade_volume"),
    ("CACHE_EXPIRATION", "cache.expiration_secs"),
    ("MAX_CONCURRENT_REQUESTS", "cache.max_concurrent_requests"),
    ("REQUEST_TIMEOUT", "cache.request_timeout_secs"),
    ("MAX_RETRIES", "cache.max_retries"),
];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from [`DEFAULT_CONFIG_PATH`] and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if sources cannot be parsed or a value fails validation.
    pub fn load() -> Result<AppConfig, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration by merging built-in defaults, the TOML file at
    /// `path` (if present), prefixed environment variables and the legacy
    /// flat variables, in that order of increasing precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if sources cannot be parsed or a value fails validation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = Self::figment(path.as_ref())
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        let legacy_names: Vec<&str> = LEGACY_ENV_KEYS.iter().map(|(name, _)| *name).collect();

        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&legacy_names).map(|key| {
                legacy_path(key.as_str())
                    .unwrap_or_else(|| key.as_str())
                    .to_owned()
                    .into()
            }))
    }
}

fn legacy_path(name: &str) -> Option<&'static str> {
    LEGACY_ENV_KEYS
        .iter()
        .find(|(legacy, _)| legacy.eq_ignore_ascii_case(name))
        .map(|(_, path)| *path)
}
