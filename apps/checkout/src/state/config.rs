//! # Configuration
//!
//! Checkout settings loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`KASSA_*`)
//! 2. Defaults (this file)
//!
//! Configuration is read-only after initialization.

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use kassa_core::{ValidityRules, MAX_CART_ITEMS};

/// Checkout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency
    pub currency_decimals: u8,

    /// Drop attached discounts whose usage limit is reached when a cart is
    /// read. Off by default: exhausted discounts stay on carts they were
    /// attached to until removed.
    pub enforce_usage_on_read: bool,

    /// Maximum number of distinct lines per cart
    pub max_cart_items: usize,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            db_path: default_database_path(),
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
            enforce_usage_on_read: false,
            max_cart_items: MAX_CART_ITEMS,
        }
    }
}

impl CheckoutConfig {
    /// Loads configuration from the process environment.
    ///
    /// ## Environment Variables
    /// - `KASSA_DB_PATH`: database file
    /// - `KASSA_CURRENCY_SYMBOL`: e.g. `€`
    /// - `KASSA_CURRENCY_DECIMALS`: e.g. `0` for JPY
    /// - `KASSA_ENFORCE_USAGE_ON_READ`: `true` / `false`
    /// - `KASSA_MAX_CART_ITEMS`: positive integer
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = CheckoutConfig::default();

        if let Some(path) = lookup("KASSA_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Some(symbol) = lookup("KASSA_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(decimals) = lookup("KASSA_CURRENCY_DECIMALS") {
            config.currency_decimals = decimals
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|d| *d <= 4)
                .ok_or_else(|| ConfigError::InvalidValue("KASSA_CURRENCY_DECIMALS".to_string()))?;
        }

        if let Some(flag) = lookup("KASSA_ENFORCE_USAGE_ON_READ") {
            config.enforce_usage_on_read = parse_flag(&flag).ok_or_else(|| {
                ConfigError::InvalidValue("KASSA_ENFORCE_USAGE_ON_READ".to_string())
            })?;
        }

        if let Some(max) = lookup("KASSA_MAX_CART_ITEMS") {
            config.max_cart_items = max
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| ConfigError::InvalidValue("KASSA_MAX_CART_ITEMS".to_string()))?;
        }

        Ok(config)
    }

    pub fn validity_rules(&self) -> ValidityRules {
        ValidityRules {
            enforce_usage_limit_on_read: self.enforce_usage_on_read,
        }
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust
    /// use kassa_checkout::CheckoutConfig;
    ///
    /// let config = CheckoutConfig::default();
    /// assert_eq!(config.format_currency(1234), "$12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let divisor = 10_i64.pow(self.currency_decimals as u32);
        let whole = cents / divisor;
        let frac = (cents % divisor).abs();

        format!(
            "{}{}{}",
            if cents < 0 { "-" } else { "" },
            self.currency_symbol,
            if self.currency_decimals > 0 {
                format!(
                    "{}.{:0width$}",
                    whole.abs(),
                    frac,
                    width = self.currency_decimals as usize
                )
            } else {
                whole.abs().to_string()
            }
        )
    }
}

/// Platform data directory, or the working directory when none is known.
///
/// - **macOS**: `~/Library/Application Support/dev.kassa.checkout/kassa.db`
/// - **Windows**: `%APPDATA%\kassa\checkout\data\kassa.db`
/// - **Linux**: `~/.local/share/checkout/kassa.db`
fn default_database_path() -> PathBuf {
    ProjectDirs::from("dev", "kassa", "checkout")
        .map(|dirs| dirs.data_dir().join("kassa.db"))
        .unwrap_or_else(|| PathBuf::from("kassa.db"))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<CheckoutConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CheckoutConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert!(!config.enforce_usage_on_read);
        assert_eq!(config.max_cart_items, MAX_CART_ITEMS);
        assert!(config.db_path.ends_with("kassa.db"));
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("KASSA_DB_PATH", "/tmp/k.db"),
            ("KASSA_ENFORCE_USAGE_ON_READ", "TRUE"),
            ("KASSA_MAX_CART_ITEMS", "25"),
            ("KASSA_CURRENCY_SYMBOL", "€"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/k.db"));
        assert!(config.validity_rules().enforce_usage_limit_on_read);
        assert_eq!(config.max_cart_items, 25);
        assert_eq!(config.format_currency(250), "€2.50");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(load(&[("KASSA_MAX_CART_ITEMS", "0")]).is_err());
        assert!(load(&[("KASSA_ENFORCE_USAGE_ON_READ", "maybe")]).is_err());
        assert!(load(&[("KASSA_CURRENCY_DECIMALS", "x")]).is_err());
    }

    #[test]
    fn test_format_currency() {
        let config = CheckoutConfig::default();
        assert_eq!(config.format_currency(100), "$1.00");
        assert_eq!(config.format_currency(1), "$0.01");
        assert_eq!(config.format_currency(-1234), "-$12.34");

        let yen = CheckoutConfig {
            currency_symbol: "¥".to_string(),
            currency_decimals: 0,
            ..CheckoutConfig::default()
        };
        assert_eq!(yen.format_currency(1500), "¥1500");
    }
}
