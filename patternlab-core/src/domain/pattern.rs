//! Confirmed double-top / double-bottom pattern events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::extremum::{ExtremumKind, ExtremumPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PatternKind {
    /// Two similar peaks around a trough; bearish, breaks down through the trough.
    DoubleTop,
    /// Two similar troughs around a peak; bullish, breaks up through the peak.
    DoubleBottom,
}

impl PatternKind {
    /// Kind of the two outer extrema.
    pub fn outer_kind(self) -> ExtremumKind {
        match self {
            Self::DoubleTop => ExtremumKind::Peak,
            Self::DoubleBottom => ExtremumKind::Trough,
        }
    }

    /// True if `close` has crossed beyond `breakout_price` in this pattern's breakout direction.
    pub fn is_breakout(self, close: f64, breakout_price: f64) -> bool {
        match self {
            Self::DoubleTop => close < breakout_price,
            Self::DoubleBottom => close > breakout_price,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DoubleTop => "double_top",
            Self::DoubleBottom => "double_bottom",
        }
    }
}

/// A confirmed double pattern.
///
/// Invariant: `first.index < intervening.index < second.index < confirmation_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEvent {
    pub kind: PatternKind,
    pub first_extremum: ExtremumPoint,
    pub second_extremum: ExtremumPoint,
    pub intervening_extremum: ExtremumPoint,
    pub confirmation_index: usize,
    pub confirmation_time: DateTime<Utc>,
    /// Close of the confirmation bar.
    pub confirmation_close: f64,
    /// Price of the intervening extremum (the neckline).
    pub breakout_price: f64,
}

impl PatternEvent {
    /// Distance from the mean outer-extremum price to the neckline.
    pub fn height(&self) -> f64 {
        let outer = (self.first_extremum.price + self.second_extremum.price) / 2.0;
        (outer - self.breakout_price).abs()
    }

    /// Measured-move target: the pattern height projected from the neckline
    /// in the breakout direction.
    pub fn target_price(&self) -> f64 {
        match self.kind {
            PatternKind::DoubleTop => self.breakout_price - self.height(),
            PatternKind::DoubleBottom => self.breakout_price + self.height(),
        }
    }

    /// The three extrema as `(kind, index)` keys.
    pub fn extremum_keys(&self) -> [(ExtremumKind, usize); 3] {
        [
            (self.first_extremum.kind, self.first_extremum.index),
            (self.intervening_extremum.kind, self.intervening_extremum.index),
            (self.second_extremum.kind, self.second_extremum.index),
        ]
    }

    /// True if both events use at least one common extremum (same kind and index).
    pub fn shares_extremum_with(&self, other: &PatternEvent) -> bool {
        let mine = self.extremum_keys();
        other.extremum_keys().iter().any(|k| mine.contains(k))
    }
}
