//! Keeper configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. Secrets never live in the file;
//! they come from the environment (`PRIVATE_KEY`, `RPC_URL`, `INCH_API_KEY`,
//! `COINGECKO_API_KEY`).

use crate::logging::LoggingConfig;
use clmm_keeper_data::config::{FeedsConfig, InstrumentConfig, StorageConfig, default_instruments};
use clmm_keeper_domain::config::{PairRegistry, RangeConfig, StrategyConfig, VolatilityConfig};
use clmm_keeper_execution::service::ScheduleConfig;
use clmm_keeper_execution::transaction::RetryPolicy;
use clmm_keeper_protocols::config::ChainConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Values read from the environment only.
#[derive(Clone, Default)]
pub struct Secrets {
    pub private_key: Option<String>,
    pub rpc_url: Option<String>,
    pub inch_api_key: Option<String>,
    pub coingecko_api_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            private_key: var("PRIVATE_KEY"),
            rpc_url: var("RPC_URL"),
            inch_api_key: var("INCH_API_KEY"),
            coingecko_api_key: var("COINGECKO_API_KEY"),
        }
    }

    pub fn private_key(&self) -> Result<&str, ConfigError> {
        self.private_key
            .as_deref()
            .ok_or(ConfigError::MissingField { field: "PRIVATE_KEY" })
    }

    pub fn inch_api_key(&self) -> Result<&str, ConfigError> {
        self.inch_api_key
            .as_deref()
            .ok_or(ConfigError::MissingField { field: "INCH_API_KEY" })
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("private_key", &shown(&self.private_key))
            .field("rpc_url", &shown(&self.rpc_url))
            .field("inch_api_key", &shown(&self.inch_api_key))
            .field("coingecko_api_key", &shown(&self.coingecko_api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub strategy: StrategyConfig,
    pub volatility: VolatilityConfig,
    pub range: RangeConfig,
    pub pairs: PairRegistry,
    pub instruments: Vec<InstrumentConfig>,
    pub storage: StorageConfig,
    pub feeds: FeedsConfig,
    pub chain: ChainConfig,
    pub schedule: ScheduleConfig,
    pub retry: RetryPolicy,
    pub logging: LoggingConfig,
    #[serde(skip)]
    pub secrets: Secrets,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            volatility: VolatilityConfig::default(),
            range: RangeConfig::default(),
            pairs: PairRegistry::default(),
            instruments: default_instruments(),
            storage: StorageConfig::default(),
            feeds: FeedsConfig::default(),
            chain: ChainConfig::default(),
            schedule: ScheduleConfig::default(),
            retry: RetryPolicy::default(),
            logging: LoggingConfig::default(),
            secrets: Secrets::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config = Self::parse(&content)?;
        config.secrets = Secrets::from_env();
        Ok(config)
    }

    /// Built-in defaults plus environment secrets.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            secrets: Secrets::from_env(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// JSON-RPC endpoint, preferring `RPC_URL`.
    pub fn rpc_url(&self) -> &str {
        self.secrets.rpc_url.as_deref().unwrap_or(&self.chain.rpc_url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str| {
            move |e: clmm_keeper_domain::DomainError| ConfigError::InvalidValue {
                field,
                reason: e.to_string(),
            }
        };
        self.strategy.validate().map_err(invalid("strategy"))?;
        self.volatility.validate().map_err(invalid("volatility"))?;
        self.range.validate().map_err(invalid("range"))?;

        for instrument in &self.instruments {
            if let Some(pair) = &instrument.volatility_pair {
                self.pairs.resolve(pair).map_err(invalid("instruments"))?;
            }
        }

        let chain = &self.chain;
        for (field, value) in [
            ("chain.pool_address", &chain.pool_address),
            ("chain.manager_address", &chain.manager_address),
            ("chain.base_token.address", &chain.base_token.address),
            ("chain.quote_token.address", &chain.quote_token.address),
            ("chain.aggregator_url", &chain.aggregator_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField { field });
            }
        }
        if chain.deposit_per_mille == 0 || chain.deposit_per_mille > 1000 {
            return Err(ConfigError::InvalidValue {
                field: "chain.deposit_per_mille",
                reason: format!("must be within 1..=1000, got {}", chain.deposit_per_mille),
            });
        }
        if !(0.0..=50.0).contains(&chain.swap_slippage_pct) {
            return Err(ConfigError::InvalidValue {
                field: "chain.swap_slippage_pct",
                reason: format!("must be within [0, 50], got {}", chain.swap_slippage_pct),
            });
        }
        if chain.call_timeout_secs == 0 || chain.confirmation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chain.call_timeout_secs",
                reason: "timeouts must be positive".into(),
            });
        }

        let schedule = &self.schedule;
        if [
            schedule.prices_secs,
            schedule.yields_secs,
            schedule.signals_secs,
            schedule.evaluate_secs,
        ]
        .contains(&0)
        {
            return Err(ConfigError::InvalidValue {
                field: "schedule",
                reason: "periods must be positive".into(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                reason: "at least one attempt is required".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = Config::parse(include_str!("../../../config/keeper.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(config.strategy, defaults.strategy);
        assert_eq!(config.range, defaults.range);
        assert_eq!(config.chain, defaults.chain);
        assert_eq!(config.pairs, defaults.pairs);
        assert_eq!(config.instruments, defaults.instruments);
        assert_eq!(config.feeds, defaults.feeds);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [strategy]
            min_apr = 250.0
            cooldown_secs = 1800

            [range]
            upper_offset_ticks = 0

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.strategy.min_apr, 250.0);
        assert_eq!(config.strategy.cooldown_secs, 1800);
        assert_eq!(config.strategy.max_volatility, 2.0);
        assert_eq!(config.range.upper_offset_ticks, 0);
        assert_eq!(config.range.width_ticks, 600);
        assert!(config.logging.is_json());
        assert_eq!(config.instruments, default_instruments());
    }

    #[test]
    fn test_invalid_strategy_is_rejected() {
        let result = Config::parse("[strategy]\napr_alpha = 1.5\n");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "strategy", .. })
        ));
    }

    #[test]
    fn test_unknown_volatility_pair_is_rejected() {
        let result = Config::parse(
            r#"
            [[instruments]]
            id = "0x01"
            range_name = "Aggressive"
            heading = "DOGE-ETH 1%"
            volatility_pair = "DOGE-ETH"
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "instruments", .. })
        ));
    }

    #[test]
    fn test_custom_pairs_replace_registry() {
        let config = Config::parse(
            r#"
            [pairs.ZRO-ETH]
            numerator = "ETH"
            denominator = "ZRO"

            [[instruments]]
            id = "0x01"
            range_name = "Aggressive"
            heading = "ZRO-ETH 2%"
            volatility_pair = "ZRO-ETH"
            "#,
        )
        .unwrap();
        assert_eq!(config.pairs.names().collect::<Vec<_>>(), vec!["ZRO-ETH"]);
        assert_eq!(config.instruments.len(), 1);
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let result = Config::parse("[schedule]\nevaluate_secs = 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "schedule", .. })
        ));
    }

    #[test]
    fn test_empty_pool_address_is_missing() {
        let result = Config::parse("[chain]\npool_address = \"\"\n");
        assert!(matches!(
            result,
            Err(ConfigError::MissingField {
                field: "chain.pool_address"
            })
        ));
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[chain]\nfee_tier = 3000").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.chain.fee_tier, 3000);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = Config::load("/nonexistent/keeper.toml");
        assert!(matches!(result, Err(ConfigError::ReadFile(_))));
    }

    #[test]
    fn test_secrets_are_redacted() {
        let secrets = Secrets {
            private_key: Some("0xdeadbeef".into()),
            ..Default::default()
        };
        let shown = format!("{secrets:?}");
        assert!(!shown.contains("deadbeef"));
        assert!(shown.contains("<set>"));
        assert!(matches!(
            secrets.inch_api_key(),
            Err(ConfigError::MissingField { field: "INCH_API_KEY" })
        ));
    }

    #[test]
    fn test_rpc_url_prefers_environment() {
        let mut config = Config::default();
        assert_eq!(config.rpc_url(), config.chain.rpc_url);
        config.secrets.rpc_url = Some("http://localhost:8545".into());
        assert_eq!(config.rpc_url(), "http://localhost:8545");
    }
}
