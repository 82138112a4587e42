//! Bar provider trait and structured error types.
//!
//! The BarProvider trait abstracts over the external bar store (CSV export
//! directory, chart-data HTTP API, in-memory fixtures) so the engine never
//! fetches data itself and tests can swap in fixtures.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bar interval supported by the bar store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    Min1,
    Min5,
    Min15,
    Min30,
    Hour1,
    Hour4,
    Day1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 7] = [
        Self::Min1,
        Self::Min5,
        Self::Min15,
        Self::Min30,
        Self::Hour1,
        Self::Hour4,
        Self::Day1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min1 => "1min",
            Self::Min5 => "5min",
            Self::Min15 => "15min",
            Self::Min30 => "30min",
            Self::Hour1 => "1H",
            Self::Hour4 => "4H",
            Self::Day1 => "1D",
        }
    }

    /// Interval length in seconds.
    pub fn seconds(self) -> i64 {
        match self {
            Self::Min1 => 60,
            Self::Min5 => 300,
            Self::Min15 => 900,
            Self::Min30 => 1_800,
            Self::Hour1 => 3_600,
            Self::Hour4 => 14_400,
            Self::Day1 => 86_400,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tf| tf.as_str() == s)
            .ok_or_else(|| DataError::InvalidTimeframe(s.to_string()))
    }
}

impl TryFrom<String> for Timeframe {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.as_str().to_string()
    }
}

/// What to fetch. `start`/`end` are inclusive; `limit` keeps the most recent bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarQuery {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl BarQuery {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            start: None,
            end: None,
            limit: None,
        }
    }

    /// Apply the time range, then the limit, to bars already in ascending order.
    pub fn apply(&self, bars: Vec<RawBar>) -> Vec<RawBar> {
        let mut bars: Vec<RawBar> = bars
            .into_iter()
            .filter(|b| self.start.map_or(true, |s| b.timestamp >= s))
            .filter(|b| self.end.map_or(true, |e| b.timestamp <= e))
            .collect();
        if let Some(limit) = self.limit {
            if bars.len() > limit {
                bars.drain(..bars.len() - limit);
            }
        }
        bars
    }
}

/// OHLCV bar as delivered by a provider, before validation.
///
/// Missing fields stay `None` so ingestion can report them with their index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// Structured error types for provider operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid timeframe '{0}' (expected one of 1min, 5min, 15min, 30min, 1H, 4H, 1D)")]
    InvalidTimeframe(String),

    #[error("symbol not found: {symbol} ({timeframe})")]
    SymbolNotFound { symbol: String, timeframe: Timeframe },

    #[error("network error: {0}")]
    Network(String),

    #[error("bar store returned an error: {0}")]
    Remote(String),

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("failed to parse {source_name} line {line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Csv,
    Http,
    InMemory,
    Synthetic,
}

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
}

/// Synchronous source of ordered OHLCV bars.
pub trait BarProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for the query, ascending by timestamp.
    fn fetch(&self, query: &BarQuery) -> Result<FetchResult, DataError>;
}
