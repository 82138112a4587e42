use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single-instrument long-only position state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Position {
    #[default]
    Flat,
    Long {
        entry_index: usize,
        entry_time: DateTime<Utc>,
        entry_price: f64,
        quantity: f64,
    },
}

impl Position {
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Self::Long { .. })
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        match self {
            Self::Flat => 0.0,
            Self::Long { quantity, .. } => quantity * current_price,
        }
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        match self {
            Self::Flat => 0.0,
            Self::Long {
                entry_price,
                quantity,
                ..
            } => quantity * (current_price - entry_price),
        }
    }
}

/// A position still open when the series ended and `close_at_end` was off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub quantity: f64,
    /// Final close used to mark the position.
    pub mark_price: f64,
    pub unrealized_pnl: f64,
}
