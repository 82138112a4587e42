//! Single-position long-only account simulation.
//!
//! Per bar, in order:
//! 1. While long and past the entry bar: stop-loss / take-profit checks against
//!    the bar's range. Gaps through a threshold fill at the open.
//! 2. Signals at the close: `sell` closes a long, `buy` opens from flat.
//! 3. Mark-to-market: equity = cash + quantity * close.
//!
//! Signals that cannot act in the current state are ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::metrics::PerformanceMetrics;
use crate::domain::{
    check_signals, equity_values, Bar, EquityPoint, ExitReason, OpenPosition, Position,
    SignalError, SignalSeries, Trade,
};

/// What happens to a position still open after the last bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOfSeriesPolicy {
    /// Close at the final close with `ExitReason::EndOfSeries`.
    #[default]
    ForceClose,
    /// Report it in `open_position`; excluded from the trade log.
    LeaveOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    pub initial_capital: f64,
    /// Fraction of current equity committed per entry, `0 < f <= 1`.
    pub position_sizing: f64,
    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    pub annualization_factor: f64,
    pub end_of_series: EndOfSeriesPolicy,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1000.0,
            position_sizing: 1.0,
            stop_loss_pct: None,
            take_profit_pct: None,
            annualization_factor: 252.0,
            end_of_series: EndOfSeriesPolicy::ForceClose,
        }
    }
}

impl PortfolioConfig {
    fn validate(&self) -> Result<(), SimulationError> {
        if !(self.initial_capital > 0.0 && self.initial_capital.is_finite()) {
            return Err(SimulationError::InvalidConfig(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if !(self.position_sizing > 0.0 && self.position_sizing <= 1.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "position_sizing must be in (0, 1], got {}",
                self.position_sizing
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error("invalid portfolio configuration: {0}")]
    InvalidConfig(String),
}

/// Everything one simulation produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: PerformanceMetrics,
    pub open_position: Option<OpenPosition>,
}

impl SimulationResult {
    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.last().map(|p| p.equity)
    }
}

/// Simulate a signal series over `bars`.
pub fn simulate_signals(
    bars: &[Bar],
    signals: &SignalSeries,
    config: &PortfolioConfig,
) -> Result<SimulationResult, SimulationError> {
    simulate(bars, signals.buy(), signals.sell(), config)
}

/// Simulate raw buy/sell flags over `bars`.
///
/// Fails on length mismatch, on an index flagged both buy and sell, and on
/// an invalid capital or sizing.
pub fn simulate(
    bars: &[Bar],
    buy: &[bool],
    sell: &[bool],
    config: &PortfolioConfig,
) -> Result<SimulationResult, SimulationError> {
    config.validate()?;
    check_signals(buy, sell, bars.len())?;

    let mut cash = config.initial_capital;
    let mut position = Position::Flat;
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if let Position::Long {
            entry_index,
            entry_price,
            ..
        } = position
        {
            if i > entry_index {
                if let Some((price, reason)) = protective_exit(bar, entry_price, config) {
                    cash += close_position(&mut position, &mut trades, i, bar, price, reason);
                }
            }
        }

        match position {
            Position::Long { .. } if sell[i] => {
                cash += close_position(
                    &mut position,
                    &mut trades,
                    i,
                    bar,
                    bar.close,
                    ExitReason::Signal,
                );
            }
            Position::Flat if buy[i] => {
                if bar.close > 0.0 {
                    let quantity = cash * config.position_sizing / bar.close;
                    cash -= quantity * bar.close;
                    debug!(bar = i, price = bar.close, quantity, "enter long");
                    position = Position::Long {
                        entry_index: i,
                        entry_time: bar.timestamp,
                        entry_price: bar.close,
                        quantity,
                    };
                } else {
                    debug!(bar = i, price = bar.close, "skipped entry at non-positive price");
                }
            }
            _ => {}
        }

        equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity: cash + position.market_value(bar.close),
        });
    }

    let mut open_position = None;
    if let (Some(last), true) = (bars.last(), position.is_long()) {
        let last_index = bars.len() - 1;
        match config.end_of_series {
            EndOfSeriesPolicy::ForceClose => {
                close_position(
                    &mut position,
                    &mut trades,
                    last_index,
                    last,
                    last.close,
                    ExitReason::EndOfSeries,
                );
            }
            EndOfSeriesPolicy::LeaveOpen => {
                if let Position::Long {
                    entry_index,
                    entry_time,
                    entry_price,
                    quantity,
                } = position
                {
                    open_position = Some(OpenPosition {
                        entry_index,
                        entry_time,
                        entry_price,
                        quantity,
                        mark_price: last.close,
                        unrealized_pnl: position.unrealized_pnl(last.close),
                    });
                }
            }
        }
    }

    let metrics = PerformanceMetrics::compute(
        &equity_values(&equity_curve),
        &trades,
        config.initial_capital,
        config.annualization_factor,
    );

    Ok(SimulationResult {
        trades,
        equity_curve,
        metrics,
        open_position,
    })
}

/// Stop-loss / take-profit fill for a long entered at `entry_price`, if the
/// bar reaches either threshold. The stop wins when both are reached.
fn protective_exit(
    bar: &Bar,
    entry_price: f64,
    config: &PortfolioConfig,
) -> Option<(f64, ExitReason)> {
    if let Some(stop_pct) = config.stop_loss_pct {
        let stop = entry_price * (1.0 - stop_pct);
        if bar.low <= stop {
            return Some((stop.min(bar.open), ExitReason::StopLoss));
        }
    }
    if let Some(tp_pct) = config.take_profit_pct {
        let target = entry_price * (1.0 + tp_pct);
        if bar.high >= target {
            return Some((target.max(bar.open), ExitReason::TakeProfit));
        }
    }
    None
}

/// Close the open long at `price`, record the trade and return the cash released.
fn close_position(
    position: &mut Position,
    trades: &mut Vec<Trade>,
    index: usize,
    bar: &Bar,
    price: f64,
    reason: ExitReason,
) -> f64 {
    let Position::Long {
        entry_index,
        entry_time,
        entry_price,
        quantity,
    } = *position
    else {
        return 0.0;
    };
    let trade = Trade::close(
        entry_index,
        entry_time,
        entry_price,
        index,
        bar.timestamp,
        price,
        quantity,
        reason,
    );
    debug!(
        bar = index,
        price,
        reason = reason.as_str(),
        profit_usd = trade.profit_usd,
        "exit long"
    );
    trades.push(trade);
    *position = Position::Flat;
    quantity * price
}
