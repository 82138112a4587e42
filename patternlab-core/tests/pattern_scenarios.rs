//! End-to-end pattern scenarios: detection through to the first trade.

use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use patternlab_core::domain::{Bar, ExitReason, PatternKind};
use patternlab_core::strategy::{DoubleTopBottomStrategy, Strategy};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: start + Duration::hours(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 500.0,
        })
        .collect()
}

/// 40 bars: rise to 100 (bar 10), fall to 90 (bar 15), rise to 99.5 (bar 20),
/// drift down and first close below 90 at bar 27, then keep falling.
fn double_top_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..=10).map(|i| 80.0 + 2.0 * i as f64).collect();
    closes.extend([98.0, 96.0, 94.0, 92.0, 90.0]); // 11..=15
    closes.extend([92.0, 94.0, 96.0, 98.0, 99.5]); // 16..=20
    closes.extend([98.0, 96.0, 94.0, 92.0, 91.0, 90.5, 89.0]); // 21..=27
    closes.extend((28..40).map(|i| 88.0 - (i - 28) as f64)); // 28..=39
    assert_eq!(closes.len(), 40);
    closes
}

fn scenario_params() -> BTreeMap<String, f64> {
    [
        ("peak_order", 3.0),
        ("trough_order", 3.0),
        ("min_bars_between", 5.0),
        ("max_bars_between", 30.0),
        ("tolerance", 0.02),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), *v))
    .collect()
}

// ── Scenario A ───────────────────────────────────────────────────────

#[test]
fn scenario_a_single_double_top() {
    let bars = make_bars(&double_top_closes());
    let strategy = DoubleTopBottomStrategy::with_params(&scenario_params()).unwrap();

    let state = strategy.calculate_indicators(&bars);
    assert!(state.insufficient_data.is_none());
    assert_eq!(state.patterns.len(), 1);

    let event = &state.patterns[0];
    assert_eq!(event.kind, PatternKind::DoubleTop);
    assert_eq!(event.first_extremum.index, 10);
    assert_eq!(event.intervening_extremum.index, 15);
    assert_eq!(event.second_extremum.index, 20);
    assert_eq!(event.breakout_price, 90.0);
    assert_eq!(event.confirmation_index, 27);
    // First close below 90 after the second peak.
    assert!(bars[21..27].iter().all(|b| b.close >= 90.0));
    assert!(bars[27].close < 90.0);

    let signals = strategy.generate_signals(&bars, &state);
    assert_eq!(signals.buy_count(), 0);
    assert!(signals.sell()[27]);
}

#[test]
fn scenario_a_sell_without_position_trades_nothing() {
    let bars = make_bars(&double_top_closes());
    let strategy = DoubleTopBottomStrategy::with_params(&scenario_params()).unwrap();
    let outcome = strategy.backtest(&bars).unwrap();
    assert!(outcome.simulation.trades.is_empty());
    assert_eq!(outcome.simulation.metrics.total_profit_pct, 0.0);
}

// ── Scenario B ───────────────────────────────────────────────────────

#[test]
fn scenario_b_double_bottom_buys_at_confirmation_close() {
    let closes: Vec<f64> = double_top_closes().iter().map(|c| 190.0 - c).collect();
    let bars = make_bars(&closes);
    let strategy = DoubleTopBottomStrategy::with_params(&scenario_params()).unwrap();

    let outcome = strategy.backtest(&bars).unwrap();
    assert_eq!(outcome.state.patterns.len(), 1);
    let event = &outcome.state.patterns[0];
    assert_eq!(event.kind, PatternKind::DoubleBottom);
    assert_eq!(event.breakout_price, 100.0);
    assert_eq!(event.confirmation_index, 27);

    let trades = &outcome.simulation.trades;
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].entry_index, 27);
    assert_eq!(trades[0].entry_price, bars[27].close);
    assert_eq!(trades[0].exit_reason, ExitReason::EndOfSeries);
    assert_eq!(trades[0].exit_price, bars[39].close);
    assert!(outcome.simulation.metrics.total_profit_pct > 0.0);
}

// ── No-signal scenario ───────────────────────────────────────────────

#[test]
fn flat_series_has_no_patterns_and_no_trades() {
    let bars = make_bars(&[42.0; 120]);
    let strategy = DoubleTopBottomStrategy::new();
    let outcome = strategy.backtest(&bars).unwrap();

    assert!(outcome.state.extrema.is_empty());
    assert!(outcome.state.patterns.is_empty());
    assert_eq!(outcome.signals.buy_count() + outcome.signals.sell_count(), 0);
    assert!(outcome.simulation.trades.is_empty());
    assert_eq!(outcome.simulation.metrics.total_profit_pct, 0.0);
    assert_eq!(outcome.simulation.metrics.max_drawdown_pct, 0.0);
    assert_eq!(outcome.simulation.equity_curve.len(), 120);
}

#[test]
fn short_series_is_not_an_error() {
    let bars = make_bars(&[1.0, 2.0, 1.5]);
    let outcome = DoubleTopBottomStrategy::new().backtest(&bars).unwrap();
    assert!(outcome.state.insufficient_data.is_some());
    assert!(outcome.simulation.trades.is_empty());
}
