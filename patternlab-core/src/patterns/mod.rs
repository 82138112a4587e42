//! Pattern detection: local extrema and double tops / double bottoms.
//!
//! Both stages are pure index scans over an immutable bar slice. Extrema are
//! computed once per run and handed to the matcher; nothing is cached
//! between runs.

pub mod double;
pub mod extrema;

pub use double::{find_double_patterns, find_patterns_of_kind, OverlapPolicy, PatternMatchConfig};
pub use extrema::{detect, find_peaks, find_troughs, required_len, ExtremumDetector, InsufficientData};

/// Flat-candle bars (open = high = low = close) from closes, one per hour.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use chrono::TimeZone;
    let start = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| crate::domain::Bar {
            timestamp: start + chrono::Duration::hours(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}
