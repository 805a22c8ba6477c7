//! Marketplace configuration file

use bounty_types::{MarketError, MarketParams, MarketResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk configuration: `[params]` and `[logging]` sections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub params: MarketParams,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl MarketConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> MarketResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(MarketConfig::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MarketError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> MarketResult<Self> {
        let config: MarketConfig =
            toml::from_str(contents).map_err(|e| MarketError::Config(e.to_string()))?;
        config.params.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bounty_types::Amount;
    use std::io::Write;

    #[test]
    fn test_load_missing_config() {
        let config = MarketConfig::load("/nonexistent/path/market.toml").unwrap();
        assert_eq!(config.params, MarketParams::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = MarketConfig::from_toml_str(
            r#"
            [params]
            fee_rate_bps = 100
            min_stake_amount = 5000
            paused = true

            [logging]
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(config.params.fee_rate_bps, 100);
        assert_eq!(config.params.min_stake_amount, Amount::new(5_000));
        assert!(config.params.paused);
        assert_eq!(config.params.dispute_window, 144);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_fee_rate_rejected() {
        let err = MarketConfig::from_toml_str("[params]\nfee_rate_bps = 1500\n").unwrap_err();
        assert!(matches!(err, MarketError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[params]\ndispute_window = 10").unwrap();
        let config = MarketConfig::load(file.path()).unwrap();
        assert_eq!(config.params.dispute_window, 10);
    }
}
