//! Performance metrics — pure functions over the trade log and equity curve.
//!
//! Every metric is a pure function: equity values and/or trades in, scalar out.
//! Degenerate inputs (no trades, flat equity) map to defined values, never errors.

use serde::{Deserialize, Serialize};

use crate::domain::Trade;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_profit_pct: f64,
    pub total_profit_usd: f64,
    pub win_rate_pct: f64,
    pub sharpe_ratio: f64,
    /// Positive percentage, `0..=100`.
    pub max_drawdown_pct: f64,
    /// `f64::INFINITY` when there are winners and no losers; serialized as `"inf"`.
    #[serde(with = "infinite_as_string")]
    pub profit_factor: f64,
    pub trade_count: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_return_per_trade_pct: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from equity values and the closed-trade log.
    pub fn compute(
        equity_curve: &[f64],
        trades: &[Trade],
        initial_capital: f64,
        annualization_factor: f64,
    ) -> Self {
        let final_equity = equity_curve.last().copied().unwrap_or(initial_capital);
        Self {
            total_profit_pct: total_profit_pct(final_equity, initial_capital),
            total_profit_usd: final_equity - initial_capital,
            win_rate_pct: win_rate_pct(trades),
            sharpe_ratio: sharpe_ratio(equity_curve, annualization_factor),
            max_drawdown_pct: max_drawdown_pct(equity_curve),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            winning_trades: trades.iter().filter(|t| t.is_winner()).count(),
            losing_trades: trades.iter().filter(|t| t.is_loser()).count(),
            avg_return_per_trade_pct: avg_return_per_trade_pct(trades),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `(final / initial - 1) * 100`; 0 for non-positive initial capital.
pub fn total_profit_pct(final_equity: f64, initial_capital: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    (final_equity / initial_capital - 1.0) * 100.0
}

/// Percentage of trades with positive USD profit; 0 with no trades.
pub fn win_rate_pct(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    100.0 * winners as f64 / trades.len() as f64
}

/// Annualized Sharpe ratio over per-bar equity returns.
///
/// Sharpe = mean(returns) / sample_std(returns) * sqrt(annualization_factor).
/// Returns 0.0 with fewer than 2 returns or zero variance.
pub fn sharpe_ratio(equity_curve: &[f64], annualization_factor: f64) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * annualization_factor.max(0.0).sqrt()
}

/// Largest peak-to-trough decline as a positive percentage.
///
/// Returns 0.0 if equity never falls below a previous high.
pub fn max_drawdown_pct(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak);
        }
    }
    (max_dd * 100.0).min(100.0)
}

/// Gross winning profit over absolute gross losing profit.
///
/// 0.0 with no trades or no winners; `f64::INFINITY` with winners and no losers.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.profit_usd)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| t.profit_usd.abs())
        .sum();

    if gross_profit <= 0.0 {
        return 0.0;
    }
    if gross_loss <= 0.0 {
        return f64::INFINITY;
    }
    gross_profit / gross_loss
}

/// Mean of per-trade `profit_pct`; 0 with no trades.
pub fn avg_return_per_trade_pct(trades: &[Trade]) -> f64 {
    let pcts: Vec<f64> = trades.iter().map(|t| t.profit_pct).collect();
    mean_f64(&pcts)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity values.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Serde helper: infinite floats travel as the strings `"inf"` / `"-inf"`.
mod infinite_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(v) => Ok(v),
            NumberOrString::String(s) => match s.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => other.parse().map_err(serde::de::Error::custom),
            },
        }
    }
}
