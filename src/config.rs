//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::error::CoreError;

/// Filter directive used when verbose logging is requested.
const VERBOSE_DIRECTIVE: &str = "market_ladder=debug,info";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Endpoints ===
    /// REST base URL for book, order and position snapshots.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Push channel URL.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Bearer token forwarded on snapshot requests and the push subscription.
    #[serde(default)]
    pub auth_token: Option<String>,

    // === Fees ===
    /// Taker fee in percent, applied to market orders.
    #[serde(default = "default_taker_fee")]
    pub taker_fee: Decimal,

    /// Maker fee in percent, applied to resting limit orders.
    #[serde(default)]
    pub maker_fee: Decimal,

    // === Transport ===
    /// REST request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Buffered push events per subscription.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_api_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_taker_fee() -> Decimal {
    Decimal::new(2, 0) // 2%
}

fn default_http_timeout_ms() -> u64 {
    5_000
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
            auth_token: None,
            taker_fee: default_taker_fee(),
            maker_fee: Decimal::ZERO,
            http_timeout_ms: default_http_timeout_ms(),
            channel_capacity: default_channel_capacity(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Load from the environment and validate.
    pub fn load_validated() -> crate::Result<Self> {
        Self::load()?.into_validated()
    }

    /// Validate, handing the configuration back on success.
    pub fn into_validated(self) -> crate::Result<Self> {
        self.validate().map_err(CoreError::InvalidConfig)?;
        Ok(self)
    }

    /// Tracing filter directive: debug for this crate when `verbose` is set
    /// here or on the command line, otherwise `RUST_LOG`.
    pub fn log_directive(&self, verbose: bool) -> String {
        if verbose || self.verbose {
            VERBOSE_DIRECTIVE.to_string()
        } else {
            self.rust_log.clone()
        }
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        for (name, fee) in [("TAKER_FEE", self.taker_fee), ("MAKER_FEE", self.maker_fee)] {
            if fee < Decimal::ZERO || fee > Decimal::ONE_HUNDRED {
                return Err(format!("{name} must be within [0, 100], got {fee}"));
            }
        }

        Url::parse(&self.api_url).map_err(|e| format!("API_URL is invalid: {e}"))?;

        let ws = Url::parse(&self.ws_url).map_err(|e| format!("WS_URL is invalid: {e}"))?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(format!("WS_URL must use ws:// or wss://, got {}", ws.scheme()));
        }

        if self.channel_capacity == 0 {
            return Err("CHANNEL_CAPACITY must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_values_are_sensible() {
        let config = Config::default();
        assert_eq!(config.taker_fee, dec!(2));
        assert_eq!(config.maker_fee, Decimal::ZERO);
        assert_eq!(config.channel_capacity, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_fee_above_hundred() {
        let config = Config {
            taker_fee: dec!(120),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_config_surfaces_as_core_error() {
        let config = Config {
            maker_fee: dec!(-1),
            ..Config::default()
        };
        match config.into_validated() {
            Err(CoreError::InvalidConfig(msg)) => assert!(msg.contains("MAKER_FEE")),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
        assert!(Config::default().into_validated().is_ok());
    }

    #[test]
    fn log_directive_follows_verbose_and_rust_log() {
        let config = Config {
            rust_log: "warn".to_string(),
            ..Config::default()
        };
        assert_eq!(config.log_directive(false), "warn");
        assert_eq!(config.log_directive(true), "market_ladder=debug,info");

        let config = Config {
            verbose: true,
            ..config
        };
        assert_eq!(config.log_directive(false), "market_ladder=debug,info");
    }

    #[test]
    fn validate_rejects_http_push_url() {
        let config = Config {
            ws_url: "http://localhost/ws".to_string(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("ws://"));
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let config = Config {
            channel_capacity: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
