//! Extremum points — local peaks and troughs of a price series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtremumKind {
    Peak,
    Trough,
}

impl ExtremumKind {
    pub fn opposite(self) -> Self {
        match self {
            Self::Peak => Self::Trough,
            Self::Trough => Self::Peak,
        }
    }
}

/// A local maximum or minimum at a specific bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremumPoint {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub kind: ExtremumKind,
}

/// Peaks and troughs of one series, each ascending by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extrema {
    pub peaks: Vec<ExtremumPoint>,
    pub troughs: Vec<ExtremumPoint>,
}

impl Extrema {
    /// Points of the given kind.
    pub fn of_kind(&self, kind: ExtremumKind) -> &[ExtremumPoint] {
        match kind {
            ExtremumKind::Peak => &self.peaks,
            ExtremumKind::Trough => &self.troughs,
        }
    }

    /// Points of `kind` whose index lies strictly inside `(lo, hi)`.
    ///
    /// Relies on the ascending-index ordering to binary-search the range.
    pub fn strictly_between(&self, kind: ExtremumKind, lo: usize, hi: usize) -> &[ExtremumPoint] {
        let points = self.of_kind(kind);
        if hi <= lo + 1 {
            return &[];
        }
        let start = points.partition_point(|p| p.index <= lo);
        let end = points.partition_point(|p| p.index < hi);
        &points[start..end.max(start)]
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty() && self.troughs.is_empty()
    }
}
