//! CSV export directory provider.
//!
//! Reads `{dir}/{SYMBOL}_{timeframe}.csv` with a header row
//! `timestamp,open,high,low,close,volume`. Timestamps may be RFC 3339,
//! unix seconds, or `YYYY-MM-DD[ HH:MM:SS]` read as UTC.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::provider::{BarProvider, BarQuery, DataError, DataSource, FetchResult, RawBar, Timeframe};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

pub struct CsvBarProvider {
    dir: PathBuf,
}

impl CsvBarProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File backing a symbol/timeframe pair.
    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", symbol.to_uppercase(), timeframe.as_str()))
    }
}

impl BarProvider for CsvBarProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, query: &BarQuery) -> Result<FetchResult, DataError> {
        let path = self.path_for(&query.symbol, query.timeframe);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: query.symbol.clone(),
                timeframe: query.timeframe,
            });
        }
        let bars = read_bars_csv(&path)?;
        debug!(path = %path.display(), rows = bars.len(), "read bar csv");

        Ok(FetchResult {
            symbol: query.symbol.to_uppercase(),
            timeframe: query.timeframe,
            bars: query.apply(bars),
            source: DataSource::Csv,
        })
    }
}

/// Read every row of a bar CSV file.
pub fn read_bars_csv(path: &Path) -> Result<Vec<RawBar>, DataError> {
    let source_name = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(&source_name, 1, e))?;

    let mut bars = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let row = row.map_err(|e| csv_error(&source_name, line, e))?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| DataError::Parse {
            source_name: source_name.clone(),
            line,
            message: format!("unrecognized timestamp '{}'", row.timestamp),
        })?;
        bars.push(RawBar {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    Ok(bars)
}

fn csv_error(source_name: &str, line: usize, e: csv::Error) -> DataError {
    if let csv::ErrorKind::Io(_) = e.kind() {
        return DataError::Io(std::io::Error::other(e.to_string()));
    }
    DataError::Parse {
        source_name: source_name.to_string(),
        line,
        message: e.to_string(),
    }
}

/// Parse a bar timestamp in any of the accepted formats.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(secs) = s.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
