//! Serializable backtest configuration.
//!
//! One TOML file describes one run:
//!
//! ```toml
//! [backtest]
//! symbol = "XAUUSD"
//! timeframe = "1H"
//! start = "2024-01-01T00:00:00Z"   # optional
//! end = "2024-06-30T00:00:00Z"     # optional
//! limit = 5000                     # optional
//!
//! [strategy]
//! type = "double_top_bottom"
//!
//! [strategy.params]
//! tolerance = 0.02
//! peak_order = 5
//! ```
//!
//! Unknown sections and keys are rejected at parse time; strategy options
//! are validated when the strategy is built.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use patternlab_core::data::{BarQuery, Timeframe};
use patternlab_core::strategy::{self, create_strategy, Strategy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("limit must be at least 1")]
    ZeroLimit,

    #[error("strategy: {0}")]
    Strategy(#[from] strategy::ConfigError),
}

/// Top-level TOML document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategySection,
}

/// `[backtest]`: which bars to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacktestSection {
    pub symbol: String,
    pub timeframe: Timeframe,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Keep only the most recent `limit` bars after the range filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// `[strategy]`: registered type name plus its flat option map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategySection {
    #[serde(rename = "type")]
    pub strategy_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl BacktestConfig {
    /// Minimal config with default strategy options.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, strategy_type: &str) -> Self {
        Self {
            backtest: BacktestSection {
                symbol: symbol.into(),
                timeframe,
                start: None,
                end: None,
                limit: None,
            },
            strategy: StrategySection {
                strategy_type: strategy_type.to_string(),
                params: BTreeMap::new(),
            },
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Range and limit checks, plus a dry build of the strategy so option
    /// errors surface before any data is loaded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let (Some(start), Some(end)) = (self.backtest.start, self.backtest.end) {
            if start > end {
                return Err(ConfigError::InvalidRange { start, end });
            }
        }
        if self.backtest.limit == Some(0) {
            return Err(ConfigError::ZeroLimit);
        }
        self.build_strategy()?;
        Ok(())
    }

    /// Provider query for the `[backtest]` section.
    pub fn query(&self) -> BarQuery {
        BarQuery {
            symbol: self.backtest.symbol.clone(),
            timeframe: self.backtest.timeframe,
            start: self.backtest.start,
            end: self.backtest.end,
            limit: self.backtest.limit,
        }
    }

    pub fn build_strategy(&self) -> Result<Box<dyn Strategy>, ConfigError> {
        Ok(create_strategy(
            &self.strategy.strategy_type,
            &self.strategy.params,
        )?)
    }

    /// Deterministic BLAKE3 hash of the strategy type, its raw options and
    /// the resolved configuration those options produce.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let strategy = self.build_strategy()?;
        let canonical = serde_json::json!({
            "type": self.strategy.strategy_type,
            "params": self.strategy.params,
            "resolved": strategy.config(),
        });
        let json =
            serde_json::to_string(&canonical).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
