//! Local extremum detection.
//!
//! Index `i` is a peak when `prices[i]` is strictly greater than every other
//! value in `[i - order, i + order]`, and a trough when strictly lower.
//! Indices with fewer than `order` neighbours on either side never qualify.
//!
//! Complexity: O(n · order), no sorting.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Extrema, ExtremumKind, ExtremumPoint, PriceSource};

/// Peak indices of `prices`, ascending.
pub fn find_peaks(prices: &[f64], order: usize) -> Vec<usize> {
    scan(prices, order, |center, other| center > other)
}

/// Trough indices of `prices`, ascending.
pub fn find_troughs(prices: &[f64], order: usize) -> Vec<usize> {
    scan(prices, order, |center, other| center < other)
}

/// Peaks and troughs of a single series.
pub fn detect(prices: &[f64], order: usize) -> (Vec<usize>, Vec<usize>) {
    (find_peaks(prices, order), find_troughs(prices, order))
}

/// Minimum series length for any extremum to exist at this order.
pub fn required_len(order: usize) -> usize {
    order.saturating_mul(2).saturating_add(1)
}

fn scan(prices: &[f64], order: usize, beats: impl Fn(f64, f64) -> bool) -> Vec<usize> {
    let n = prices.len();
    if order == 0 || n < required_len(order) {
        return Vec::new();
    }

    let mut out = Vec::new();
    for i in order..(n - order) {
        let center = prices[i];
        let window = &prices[i - order..=i + order];
        let strict = window
            .iter()
            .enumerate()
            .all(|(k, &v)| k == order || beats(center, v));
        if strict {
            out.push(i);
        }
    }
    out
}

// ─── Detector over bars ─────────────────────────────────────────────

/// Not an error: the series was too short for the configured window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientData {
    pub bars: usize,
    pub required: usize,
}

impl fmt::Display for InsufficientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "insufficient data: {} bars, at least {} required for extremum detection",
            self.bars, self.required
        )
    }
}

/// Peak/trough detector reading configurable bar columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtremumDetector {
    pub peak_order: usize,
    pub trough_order: usize,
    pub peak_source: PriceSource,
    pub trough_source: PriceSource,
}

impl Default for ExtremumDetector {
    fn default() -> Self {
        Self {
            peak_order: 5,
            trough_order: 5,
            peak_source: PriceSource::High,
            trough_source: PriceSource::Low,
        }
    }
}

impl ExtremumDetector {
    pub fn new(peak_order: usize, trough_order: usize) -> Self {
        Self {
            peak_order,
            trough_order,
            ..Self::default()
        }
    }

    /// Diagnostic when `bar_count` is too short for either scan.
    pub fn check_len(&self, bar_count: usize) -> Option<InsufficientData> {
        let required = required_len(self.peak_order.min(self.trough_order));
        (bar_count < required).then_some(InsufficientData {
            bars: bar_count,
            required,
        })
    }

    pub fn detect(&self, bars: &[Bar]) -> Extrema {
        Extrema {
            peaks: self.points(bars, ExtremumKind::Peak),
            troughs: self.points(bars, ExtremumKind::Trough),
        }
    }

    fn points(&self, bars: &[Bar], kind: ExtremumKind) -> Vec<ExtremumPoint> {
        let (source, order) = match kind {
            ExtremumKind::Peak => (self.peak_source, self.peak_order),
            ExtremumKind::Trough => (self.trough_source, self.trough_order),
        };
        let prices: Vec<f64> = bars.iter().map(|b| b.price(source)).collect();
        let indices = match kind {
            ExtremumKind::Peak => find_peaks(&prices, order),
            ExtremumKind::Trough => find_troughs(&prices, order),
        };
        indices
            .into_iter()
            .map(|index| ExtremumPoint {
                index,
                timestamp: bars[index].timestamp,
                price: prices[index],
                kind,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::make_bars;

    #[test]
    fn single_peak_and_trough() {
        let prices = [1.0, 2.0, 5.0, 2.0, 1.0, 0.0, 1.0, 2.0];
        let (peaks, troughs) = detect(&prices, 2);
        assert_eq!(peaks, vec![2]);
        assert_eq!(troughs, vec![5]);
    }

    #[test]
    fn plateau_is_not_an_extremum() {
        let prices = [1.0, 2.0, 3.0, 3.0, 2.0, 1.0];
        assert!(find_peaks(&prices, 1).is_empty());
        assert!(find_peaks(&prices, 2).is_empty());
    }

    #[test]
    fn boundary_indices_never_qualify() {
        // Maximum at index 0 and minimum at the last index.
        let prices = [9.0, 5.0, 6.0, 4.0, 7.0, 3.0];
        let (peaks, troughs) = detect(&prices, 1);
        assert!(!peaks.contains(&0));
        assert!(!troughs.contains(&5));
        assert_eq!(peaks, vec![2, 4]);
        assert_eq!(troughs, vec![1, 3]);
    }

    #[test]
    fn short_series_is_empty() {
        let prices = [1.0, 3.0, 1.0, 0.5];
        assert_eq!(required_len(2), 5);
        let (peaks, troughs) = detect(&prices, 2);
        assert!(peaks.is_empty());
        assert!(troughs.is_empty());
        assert_eq!(detect(&prices, 1).0, vec![1]);
    }

    #[test]
    fn huge_order_saturates_instead_of_overflowing() {
        assert_eq!(required_len(usize::MAX), usize::MAX);
        let prices = [1.0, 3.0, 1.0, 0.5, 2.0];
        assert_eq!(detect(&prices, usize::MAX), (vec![], vec![]));
    }

    #[test]
    fn zero_order_yields_nothing() {
        assert!(find_peaks(&[1.0, 2.0, 1.0], 0).is_empty());
    }

    #[test]
    fn detector_reads_high_for_peaks_and_low_for_troughs() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 11.0, 10.0, 9.0, 10.0]);
        // Shift the low column so the trough sits one bar later than on close.
        bars[5].low = 8.9;
        bars[6].low = 8.5;
        bars.push(bars[6].clone());
        bars[7].timestamp += chrono::Duration::hours(1);
        bars[7].low = 9.5;

        let extrema = ExtremumDetector::new(2, 1).detect(&bars);
        assert_eq!(extrema.peaks.len(), 1);
        assert_eq!(extrema.peaks[0].index, 2);
        assert_eq!(extrema.peaks[0].price, bars[2].high);
        assert_eq!(extrema.troughs.len(), 1);
        assert_eq!(extrema.troughs[0].index, 6);
        assert_eq!(extrema.troughs[0].kind, ExtremumKind::Trough);
    }

    #[test]
    fn insufficient_data_diagnostic() {
        let detector = ExtremumDetector::new(5, 3);
        assert_eq!(
            detector.check_len(6),
            Some(InsufficientData {
                bars: 6,
                required: 7
            })
        );
        assert_eq!(detector.check_len(7), None);
    }
}
