//! Trade — a completed long round trip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    EndOfSeries,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
            Self::EndOfSeries => "end_of_series",
        }
    }
}

/// A closed long trade: entry fill to exit fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub quantity: f64,
    pub bars_held: usize,

    // ── PnL ──
    /// Fractional return: `(exit - entry) / entry`.
    pub return_pct: f64,
    /// `return_pct * 100`.
    pub profit_pct: f64,
    /// `quantity * (exit - entry)`.
    pub profit_usd: f64,
}

impl Trade {
    /// Build a trade from its fills, deriving every PnL field.
    #[allow(clippy::too_many_arguments)]
    pub fn close(
        entry_index: usize,
        entry_time: DateTime<Utc>,
        entry_price: f64,
        exit_index: usize,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        quantity: f64,
        exit_reason: ExitReason,
    ) -> Self {
        let return_pct = if entry_price == 0.0 {
            0.0
        } else {
            (exit_price - entry_price) / entry_price
        };
        Self {
            entry_index,
            entry_time,
            entry_price,
            exit_index,
            exit_time,
            exit_price,
            exit_reason,
            quantity,
            bars_held: exit_index.saturating_sub(entry_index),
            return_pct,
            profit_pct: return_pct * 100.0,
            profit_usd: quantity * (exit_price - entry_price),
        }
    }

    pub fn is_winner(&self) -> bool {
        self.profit_usd > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.profit_usd < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trade() -> Trade {
        Trade::close(
            4,
            Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
            100.0,
            9,
            Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
            110.0,
            10.0,
            ExitReason::Signal,
        )
    }

    #[test]
    fn derived_pnl_fields() {
        let trade = sample_trade();
        assert!((trade.return_pct - 0.10).abs() < 1e-12);
        assert!((trade.profit_pct - 10.0).abs() < 1e-9);
        assert!((trade.profit_usd - 100.0).abs() < 1e-9);
        assert_eq!(trade.bars_held, 5);
        assert!(trade.is_winner());
        assert!(!trade.is_loser());
    }

    #[test]
    fn exit_reason_serializes_snake_case() {
        let json = serde_json::to_string(&ExitReason::EndOfSeries).unwrap();
        assert_eq!(json, "\"end_of_series\"");
        assert_eq!(ExitReason::StopLoss.as_str(), "stop_loss");
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, back);
    }
}
