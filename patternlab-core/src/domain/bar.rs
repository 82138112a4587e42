//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for one fixed time interval.
///
/// Bars reach the engine only through [`crate::data::ingest`], which guarantees
/// strictly increasing timestamps and finite OHLC fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Value of the requested price column.
    pub fn price(&self, source: PriceSource) -> f64 {
        match source {
            PriceSource::Open => self.open,
            PriceSource::High => self.high,
            PriceSource::Low => self.low,
            PriceSource::Close => self.close,
        }
    }
}

/// Which bar column an extremum scan reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Open,
    High,
    Low,
    Close,
}

/// Extract one price column from a bar slice.
pub fn price_series(bars: &[Bar], source: PriceSource) -> Vec<f64> {
    bars.iter().map(|b| b.price(source)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar() -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn price_selects_column() {
        let bar = sample_bar();
        assert_eq!(bar.price(PriceSource::Open), 100.0);
        assert_eq!(bar.price(PriceSource::High), 105.0);
        assert_eq!(bar.price(PriceSource::Low), 98.0);
        assert_eq!(bar.price(PriceSource::Close), 103.0);
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        assert!(!bar.is_void());
        bar.close = f64::NAN;
        assert!(bar.is_void());
        bar.close = f64::INFINITY;
        assert!(bar.is_void());
    }

    #[test]
    fn price_source_serializes_snake_case() {
        let json = serde_json::to_string(&PriceSource::High).unwrap();
        assert_eq!(json, "\"high\"");
    }
}
