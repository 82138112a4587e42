//! Double-top / double-bottom matching.
//!
//! For each pattern kind the matcher walks same-kind extremum pairs
//! `(e1, e2)` in ascending `e2.index`, keeps pairs whose spacing and relative
//! price difference are within bounds and that enclose exactly one
//! opposite-kind extremum, then scans forward from `e2.index + 1` for the
//! first close beyond that intervening price.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Bar, Extrema, ExtremumKind, ExtremumPoint, PatternEvent, PatternKind};

/// How confirmed candidates that share an extremum are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Keep the earliest-confirmed candidate, discard later ones sharing any of its extrema.
    #[default]
    EarliestConfirmed,
    /// Emit every confirmed candidate.
    KeepAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternMatchConfig {
    /// Maximum `|p1 - p2| / p1` between the outer extrema.
    pub tolerance: f64,
    pub min_bars_between: usize,
    pub max_bars_between: usize,
    /// Bars after `e2` to search for the breakout; `None` scans to the end.
    pub max_confirmation_bars: Option<usize>,
    pub overlap_policy: OverlapPolicy,
}

impl Default for PatternMatchConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.02,
            min_bars_between: 10,
            max_bars_between: 100,
            max_confirmation_bars: None,
            overlap_policy: OverlapPolicy::EarliestConfirmed,
        }
    }
}

/// Confirmed double tops and double bottoms.
///
/// Output is ordered by `confirmation_index`, then by the second extremum's
/// index, with double tops before double bottoms on a tie.
pub fn find_double_patterns(
    extrema: &Extrema,
    bars: &[Bar],
    config: &PatternMatchConfig,
) -> Vec<PatternEvent> {
    let mut events = find_patterns_of_kind(PatternKind::DoubleTop, extrema, bars, config);
    events.extend(find_patterns_of_kind(
        PatternKind::DoubleBottom,
        extrema,
        bars,
        config,
    ));
    events.sort_by_key(|e| (e.confirmation_index, e.second_extremum.index, e.kind));
    events
}

/// Confirmed patterns of a single kind, ordered as in [`find_double_patterns`].
pub fn find_patterns_of_kind(
    kind: PatternKind,
    extrema: &Extrema,
    bars: &[Bar],
    config: &PatternMatchConfig,
) -> Vec<PatternEvent> {
    let outer_kind = kind.outer_kind();
    let outer = extrema.of_kind(outer_kind);

    let mut candidates = Vec::new();
    for (j, e2) in outer.iter().enumerate() {
        let earliest = e2.index.saturating_sub(config.max_bars_between);
        let start = outer[..j].partition_point(|p| p.index < earliest);
        for e1 in &outer[start..j] {
            let spacing = e2.index - e1.index;
            if spacing < config.min_bars_between || !within_tolerance(e1, e2, config.tolerance) {
                continue;
            }
            let between = extrema.strictly_between(outer_kind.opposite(), e1.index, e2.index);
            let [intervening] = between else {
                continue;
            };
            if let Some(event) = confirm(kind, e1, e2, intervening, bars, config) {
                candidates.push(event);
            }
        }
    }
    let found = candidates.len();

    candidates.sort_by_key(|e| {
        (
            e.confirmation_index,
            e.second_extremum.index,
            e.first_extremum.index,
        )
    });
    let events = match config.overlap_policy {
        OverlapPolicy::KeepAll => candidates,
        OverlapPolicy::EarliestConfirmed => drop_overlapping(candidates),
    };
    debug!(
        pattern = kind.as_str(),
        candidates = found,
        kept = events.len(),
        "matched double patterns"
    );
    events
}

fn within_tolerance(e1: &ExtremumPoint, e2: &ExtremumPoint, tolerance: f64) -> bool {
    if e1.price == 0.0 {
        return e2.price == 0.0;
    }
    ((e1.price - e2.price) / e1.price).abs() <= tolerance
}

fn confirm(
    kind: PatternKind,
    e1: &ExtremumPoint,
    e2: &ExtremumPoint,
    intervening: &ExtremumPoint,
    bars: &[Bar],
    config: &PatternMatchConfig,
) -> Option<PatternEvent> {
    let from = e2.index + 1;
    let to = match config.max_confirmation_bars {
        Some(window) => e2.index.saturating_add(window).saturating_add(1).min(bars.len()),
        None => bars.len(),
    };
    let breakout_price = intervening.price;
    let confirmation_index = (from..to).find(|&k| kind.is_breakout(bars[k].close, breakout_price))?;
    let bar = &bars[confirmation_index];
    Some(PatternEvent {
        kind,
        first_extremum: e1.clone(),
        second_extremum: e2.clone(),
        intervening_extremum: intervening.clone(),
        confirmation_index,
        confirmation_time: bar.timestamp,
        confirmation_close: bar.close,
        breakout_price,
    })
}

/// Greedy pass over candidates sorted by confirmation: accept a candidate only
/// if none of its extrema was used by an accepted one.
fn drop_overlapping(candidates: Vec<PatternEvent>) -> Vec<PatternEvent> {
    let mut used: HashSet<(ExtremumKind, usize)> = HashSet::new();
    let mut kept = Vec::new();
    for event in candidates {
        let keys = event.extremum_keys();
        if keys.iter().any(|k| used.contains(k)) {
            continue;
        }
        used.extend(keys);
        kept.push(event);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{make_bars, ExtremumDetector};

    fn config(min: usize, max: usize) -> PatternMatchConfig {
        PatternMatchConfig {
            tolerance: 0.02,
            min_bars_between: min,
            max_bars_between: max,
            ..PatternMatchConfig::default()
        }
    }

    /// Peaks at 3 and 9 (100 / 99.5), trough at 6 (90), breaks below 90 at bar 13.
    fn double_top_closes() -> Vec<f64> {
        vec![
            90.0, 94.0, 97.0, 100.0, 96.0, 93.0, 90.0, 93.0, 96.0, 99.5, 96.0, 93.0, 91.0, 89.0,
            88.0, 87.0,
        ]
    }

    #[test]
    fn confirms_double_top_on_first_close_below_neckline() {
        let bars = make_bars(&double_top_closes());
        let extrema = ExtremumDetector::new(2, 2).detect(&bars);
        let events = find_double_patterns(&extrema, &bars, &config(3, 20));

        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.kind, PatternKind::DoubleTop);
        assert_eq!(e.first_extremum.index, 3);
        assert_eq!(e.intervening_extremum.index, 6);
        assert_eq!(e.second_extremum.index, 9);
        assert_eq!(e.confirmation_index, 13);
        assert_eq!(e.breakout_price, 90.0);
        assert_eq!(e.confirmation_close, 89.0);
    }

    #[test]
    fn spacing_bounds_are_inclusive() {
        let bars = make_bars(&double_top_closes());
        let extrema = ExtremumDetector::new(2, 2).detect(&bars);
        assert_eq!(find_double_patterns(&extrema, &bars, &config(6, 6)).len(), 1);
        assert!(find_double_patterns(&extrema, &bars, &config(7, 20)).is_empty());
        assert!(find_double_patterns(&extrema, &bars, &config(1, 5)).is_empty());
    }

    #[test]
    fn tolerance_rejects_dissimilar_peaks() {
        let mut closes = double_top_closes();
        closes[9] = 97.5;
        let bars = make_bars(&closes);
        let extrema = ExtremumDetector::new(2, 2).detect(&bars);
        assert!(find_double_patterns(&extrema, &bars, &config(3, 20)).is_empty());
    }

    #[test]
    fn unconfirmed_candidate_is_discarded() {
        let closes: Vec<f64> = double_top_closes().into_iter().take(13).collect();
        let bars = make_bars(&closes);
        let extrema = ExtremumDetector::new(2, 2).detect(&bars);
        assert!(find_double_patterns(&extrema, &bars, &config(3, 20)).is_empty());
    }

    #[test]
    fn confirmation_window_limits_scan() {
        let bars = make_bars(&double_top_closes());
        let extrema = ExtremumDetector::new(2, 2).detect(&bars);
        let mut cfg = config(3, 20);
        cfg.max_confirmation_bars = Some(3);
        assert!(find_double_patterns(&extrema, &bars, &cfg).is_empty());
        cfg.max_confirmation_bars = Some(4);
        assert_eq!(find_double_patterns(&extrema, &bars, &cfg).len(), 1);
    }

    #[test]
    fn ambiguous_structure_is_rejected() {
        // Two troughs between the outer peaks.
        let extrema = Extrema {
            peaks: vec![point(2, 100.0, ExtremumKind::Peak), point(12, 100.0, ExtremumKind::Peak)],
            troughs: vec![
                point(5, 90.0, ExtremumKind::Trough),
                point(9, 91.0, ExtremumKind::Trough),
            ],
        };
        let bars = make_bars(&[95.0; 20].iter().copied().chain([80.0]).collect::<Vec<_>>());
        assert!(find_double_patterns(&extrema, &bars, &config(3, 20)).is_empty());
    }

    fn point(index: usize, price: f64, kind: ExtremumKind) -> ExtremumPoint {
        ExtremumPoint {
            index,
            timestamp: chrono::DateTime::from_timestamp(index as i64 * 3600, 0).unwrap(),
            price,
            kind,
        }
    }

    /// Three equal peaks 0/10/20 with troughs 5/15: candidates (0,10) and
    /// (10,20) share peak 10, plus the wide pair (0,20) is ambiguous.
    fn triple_top() -> (Extrema, Vec<Bar>) {
        let extrema = Extrema {
            peaks: vec![
                point(0, 100.0, ExtremumKind::Peak),
                point(10, 100.0, ExtremumKind::Peak),
                point(20, 100.0, ExtremumKind::Peak),
            ],
            troughs: vec![
                point(5, 90.0, ExtremumKind::Trough),
                point(15, 92.0, ExtremumKind::Trough),
            ],
        };
        let mut closes = vec![95.0; 30];
        // Bar 22 closes below 92 (confirms the second pair), bar 24 below 90.
        closes[22] = 91.0;
        closes[24] = 89.0;
        (extrema, make_bars(&closes))
    }

    #[test]
    fn earliest_confirmed_wins_on_overlap() {
        let (extrema, bars) = triple_top();
        let cfg = config(5, 30);

        // (0,10) scans from 11 and confirms at 24; (10,20) confirms at 22.
        let events = find_double_patterns(&extrema, &bars, &cfg);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].first_extremum.index, 10);
        assert_eq!(events[0].confirmation_index, 22);
    }

    #[test]
    fn keep_all_emits_overlapping_candidates() {
        let (extrema, bars) = triple_top();
        let mut cfg = config(5, 30);
        cfg.overlap_policy = OverlapPolicy::KeepAll;

        let events = find_double_patterns(&extrema, &bars, &cfg);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].confirmation_index, 22);
        assert_eq!(events[1].confirmation_index, 24);
    }

    #[test]
    fn mixed_kinds_are_ordered_by_confirmation() {
        let extrema = Extrema {
            peaks: vec![
                point(0, 100.0, ExtremumKind::Peak),
                point(10, 100.0, ExtremumKind::Peak),
            ],
            troughs: vec![
                point(5, 90.0, ExtremumKind::Trough),
                point(15, 90.0, ExtremumKind::Trough),
            ],
        };
        // Peak pair (0,10) confirms below 90; trough pair (5,15) confirms above 100.
        let mut closes = vec![95.0; 25];
        closes[12] = 89.0;
        closes[18] = 101.0;
        let bars = make_bars(&closes);

        let events = find_double_patterns(&extrema, &bars, &config(5, 30));
        let kinds: Vec<PatternKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![PatternKind::DoubleTop, PatternKind::DoubleBottom]);
        assert_eq!(events[0].confirmation_index, 12);
        assert_eq!(events[1].confirmation_index, 18);
    }
}
