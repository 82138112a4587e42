//! Ingestion — turns provider bars into validated [`Bar`]s.
//!
//! Malformed input is rejected here, before any detection runs, with the
//! offending index and timestamp so the failure can be reproduced.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::provider::RawBar;
use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataQualityError {
    #[error("bar {index} ({timestamp}): missing {field}")]
    MissingField {
        index: usize,
        timestamp: DateTime<Utc>,
        field: &'static str,
    },

    #[error("bar {index} ({timestamp}): {field} is not finite ({value})")]
    NonFinite {
        index: usize,
        timestamp: DateTime<Utc>,
        field: &'static str,
        value: f64,
    },

    #[error("bar {index}: timestamp {timestamp} duplicates the previous bar")]
    DuplicateTimestamp {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("bar {index}: timestamp {timestamp} is earlier than previous {previous}")]
    NonMonotonic {
        index: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}

impl DataQualityError {
    /// Index of the offending bar.
    pub fn index(&self) -> usize {
        match self {
            Self::MissingField { index, .. }
            | Self::NonFinite { index, .. }
            | Self::DuplicateTimestamp { index, .. }
            | Self::NonMonotonic { index, .. } => *index,
        }
    }
}

/// Validate raw bars and convert them. A missing volume is read as zero;
/// a missing OHLC field is an error.
pub fn ingest(raw: Vec<RawBar>) -> Result<Vec<Bar>, DataQualityError> {
    let mut bars = Vec::with_capacity(raw.len());
    for (index, r) in raw.into_iter().enumerate() {
        let ts = r.timestamp;
        let field = |value: Option<f64>, name: &'static str| {
            value.ok_or(DataQualityError::MissingField {
                index,
                timestamp: ts,
                field: name,
            })
        };
        bars.push(Bar {
            timestamp: ts,
            open: field(r.open, "open")?,
            high: field(r.high, "high")?,
            low: field(r.low, "low")?,
            close: field(r.close, "close")?,
            volume: r.volume.unwrap_or(0.0),
        });
    }
    validate_bars(&bars)?;
    Ok(bars)
}

/// Check ordering and finiteness of an already-built bar sequence.
pub fn validate_bars(bars: &[Bar]) -> Result<(), DataQualityError> {
    for (index, bar) in bars.iter().enumerate() {
        for (field, value) in [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ] {
            if !value.is_finite() {
                return Err(DataQualityError::NonFinite {
                    index,
                    timestamp: bar.timestamp,
                    field,
                    value,
                });
            }
        }
        if index == 0 {
            continue;
        }
        let previous = bars[index - 1].timestamp;
        if bar.timestamp == previous {
            return Err(DataQualityError::DuplicateTimestamp {
                index,
                timestamp: bar.timestamp,
            });
        }
        if bar.timestamp < previous {
            return Err(DataQualityError::NonMonotonic {
                index,
                timestamp: bar.timestamp,
                previous,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(minute: u32, close: Option<f64>) -> RawBar {
        RawBar {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap(),
            open: Some(100.0),
            high: Some(101.0),
            low: Some(99.0),
            close,
            volume: None,
        }
    }

    #[test]
    fn clean_bars_pass() {
        let bars = ingest(vec![raw(0, Some(100.5)), raw(1, Some(100.7))]).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].volume, 0.0);
    }

    #[test]
    fn missing_close_reports_index() {
        let err = ingest(vec![raw(0, Some(1.0)), raw(1, None)]).unwrap_err();
        assert!(matches!(
            err,
            DataQualityError::MissingField { index: 1, field: "close", .. }
        ));
    }

    #[test]
    fn nan_close_is_rejected() {
        let err = ingest(vec![raw(0, Some(f64::NAN))]).unwrap_err();
        assert!(matches!(err, DataQualityError::NonFinite { index: 0, .. }));
    }

    #[test]
    fn duplicate_and_backwards_timestamps_are_rejected() {
        let err = ingest(vec![raw(0, Some(1.0)), raw(0, Some(1.0))]).unwrap_err();
        assert!(matches!(err, DataQualityError::DuplicateTimestamp { index: 1, .. }));

        let err = ingest(vec![raw(5, Some(1.0)), raw(3, Some(1.0))]).unwrap_err();
        assert!(matches!(err, DataQualityError::NonMonotonic { index: 1, .. }));
        assert_eq!(err.index(), 1);
    }

    #[test]
    fn empty_input_is_valid() {
        assert!(ingest(Vec::new()).unwrap().is_empty());
    }
}
