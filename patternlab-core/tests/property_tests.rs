//! Property tests for detection, matching and simulation invariants.
//!
//! Uses proptest to verify:
//! 1. Extremum strictness — every reported peak/trough beats its whole window
//! 2. Extremum spacing — consecutive same-kind extrema have a lower/higher value between them
//! 3. Pattern invariants — index ordering, tolerance, first-crossing confirmation
//! 4. Metric bounds — win rate, drawdown, profit factor, equity length

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use patternlab_core::domain::{Bar, PatternKind, SignalSeries};
use patternlab_core::patterns::{
    detect, find_double_patterns, ExtremumDetector, OverlapPolicy, PatternMatchConfig,
};
use patternlab_core::portfolio::{simulate, PortfolioConfig};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_prices() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-2.0..2.0_f64, 10..250).prop_map(|steps| {
        let mut price = 100.0_f64;
        steps
            .into_iter()
            .map(|s| {
                price = (price + s).max(1.0);
                (price * 100.0).round() / 100.0
            })
            .collect()
    })
}

fn to_bars(closes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: start + Duration::hours(i as i64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1.0,
        })
        .collect()
}

// ── 1-2. Extrema ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn extrema_are_strict_window_extremes(prices in arb_prices(), order in 1usize..6) {
        let (peaks, troughs) = detect(&prices, order);
        for &i in &peaks {
            prop_assert!(i >= order && i + order < prices.len());
            for j in (i - order)..=(i + order) {
                prop_assert!(j == i || prices[i] > prices[j]);
            }
        }
        for &i in &troughs {
            prop_assert!(i >= order && i + order < prices.len());
            for j in (i - order)..=(i + order) {
                prop_assert!(j == i || prices[i] < prices[j]);
            }
        }
    }

    #[test]
    fn consecutive_peaks_enclose_a_lower_value(prices in arb_prices(), order in 1usize..6) {
        let (peaks, troughs) = detect(&prices, order);
        for w in peaks.windows(2) {
            let (a, b) = (w[0], w[1]);
            prop_assert!(b - a > order);
            let low = prices[a + 1..b].iter().cloned().fold(f64::INFINITY, f64::min);
            prop_assert!(low < prices[a] && low < prices[b]);
        }
        for w in troughs.windows(2) {
            let (a, b) = (w[0], w[1]);
            prop_assert!(b - a > order);
            let high = prices[a + 1..b].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(high > prices[a] && high > prices[b]);
        }
    }
}

// ── 3. Patterns ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn pattern_events_hold_invariants(
        prices in arb_prices(),
        order in 1usize..4,
        tolerance in 0.005..0.05_f64,
        min_between in 1usize..6,
        keep_all in any::<bool>(),
    ) {
        let bars = to_bars(&prices);
        let config = PatternMatchConfig {
            tolerance,
            min_bars_between: min_between,
            max_bars_between: min_between + 40,
            max_confirmation_bars: None,
            overlap_policy: if keep_all { OverlapPolicy::KeepAll } else { OverlapPolicy::EarliestConfirmed },
        };
        let extrema = ExtremumDetector::new(order, order).detect(&bars);
        let events = find_double_patterns(&extrema, &bars, &config);

        for e in &events {
            let (first, mid, second) = (&e.first_extremum, &e.intervening_extremum, &e.second_extremum);
            prop_assert!(first.index < mid.index && mid.index < second.index);
            prop_assert!(second.index < e.confirmation_index);
            let spacing = second.index - first.index;
            prop_assert!(spacing >= config.min_bars_between && spacing <= config.max_bars_between);
            prop_assert!(((first.price - second.price) / first.price).abs() <= tolerance);
            prop_assert_eq!(first.kind, e.kind.outer_kind());
            prop_assert_eq!(second.kind, e.kind.outer_kind());
            prop_assert_eq!(mid.kind, e.kind.outer_kind().opposite());
            prop_assert_eq!(e.breakout_price, mid.price);

            // Confirmation is the first crossing after the second extremum.
            let c = e.confirmation_index;
            prop_assert!(e.kind.is_breakout(bars[c].close, e.breakout_price));
            for bar in &bars[second.index + 1..c] {
                prop_assert!(!e.kind.is_breakout(bar.close, e.breakout_price));
            }
        }

        // Ordered by confirmation, tops first on ties.
        for w in events.windows(2) {
            let key = |e: &patternlab_core::domain::PatternEvent| (e.confirmation_index, e.second_extremum.index, e.kind);
            prop_assert!(key(&w[0]) <= key(&w[1]));
        }

        if !keep_all {
            for (i, a) in events.iter().enumerate() {
                for b in &events[i + 1..] {
                    prop_assert!(a.kind != b.kind || !a.shares_extremum_with(b));
                }
            }
        }

        let tops = events.iter().filter(|e| e.kind == PatternKind::DoubleTop).count();
        let bottoms = events.len() - tops;
        prop_assert_eq!(tops + bottoms, events.len());
    }
}

// ── 4. Simulation ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn metrics_stay_in_bounds(
        prices in arb_prices(),
        buy_at in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
        sell_at in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
        sizing in 0.1..=1.0_f64,
    ) {
        let bars = to_bars(&prices);
        let n = bars.len();
        let signals = SignalSeries::from_indices(
            n,
            buy_at.iter().map(|ix| ix.index(n)),
            sell_at.iter().map(|ix| ix.index(n)),
        );
        for i in 0..n {
            prop_assert!(!(signals.buy()[i] && signals.sell()[i]));
        }

        let config = PortfolioConfig { position_sizing: sizing, ..PortfolioConfig::default() };
        let result = simulate(&bars, signals.buy(), signals.sell(), &config).unwrap();
        let m = &result.metrics;

        prop_assert_eq!(result.equity_curve.len(), n);
        prop_assert!((result.equity_curve[0].equity - config.initial_capital).abs() < 1e-9);
        prop_assert!(result.equity_curve.iter().all(|p| p.equity >= 0.0));
        prop_assert!((0.0..=100.0).contains(&m.win_rate_pct));
        prop_assert!((0.0..=100.0).contains(&m.max_drawdown_pct));
        prop_assert!(m.profit_factor >= 0.0);
        prop_assert_eq!(m.trade_count, result.trades.len());
        prop_assert_eq!(m.winning_trades + m.losing_trades <= m.trade_count, true);

        // Trades never overlap and never run backwards.
        for t in &result.trades {
            prop_assert!(t.entry_index <= t.exit_index);
        }
        for w in result.trades.windows(2) {
            prop_assert!(w[0].exit_index <= w[1].entry_index);
        }
        prop_assert!(result.open_position.is_none());
    }
}
