//! Strategy abstraction: bars → indicator state → buy/sell signals → simulation.
//!
//! A strategy is anything implementing [`Strategy`]. Concrete strategies own
//! only their validated configuration; all derived state is returned from
//! `calculate_indicators` and passed back into `generate_signals`, so running
//! the same strategy twice on the same bars yields identical output.

pub mod config;
pub mod double_bottom_only;
pub mod double_top_bottom;
pub mod factory;

pub use config::{ConfigError, StrategyConfig, COMMON_OPTIONS, MAX_WHOLE};
pub use double_bottom_only::DoubleBottomOnlyStrategy;
pub use double_top_bottom::DoubleTopBottomStrategy;
pub use factory::{create_strategy, STRATEGY_TYPES};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::data::{validate_bars, DataQualityError};
use crate::domain::{Bar, Extrema, PatternEvent, PatternKind, SignalSeries};
use crate::patterns::{find_patterns_of_kind, InsufficientData};
use crate::portfolio::{simulate_signals, SimulationError, SimulationResult};

/// Derived state a pattern strategy computes from bars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorState {
    pub extrema: Extrema,
    /// Confirmed patterns ordered by confirmation index.
    pub patterns: Vec<PatternEvent>,
    /// Set when the series was too short for extremum detection.
    pub insufficient_data: Option<InsufficientData>,
}

impl IndicatorState {
    pub fn patterns_of(&self, kind: PatternKind) -> impl Iterator<Item = &PatternEvent> + '_ {
        self.patterns.iter().filter(move |p| p.kind == kind)
    }

    pub fn count(&self, kind: PatternKind) -> usize {
        self.patterns_of(kind).count()
    }
}

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("data quality: {0}")]
    DataQuality(#[from] DataQualityError),

    #[error("simulation: {0}")]
    Simulation(#[from] SimulationError),
}

/// Everything one backtest invocation produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub state: IndicatorState,
    pub signals: SignalSeries,
    pub simulation: SimulationResult,
}

impl std::fmt::Debug for dyn Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name())
            .field("config", self.config())
            .finish()
    }
}

pub trait Strategy: Send + Sync {
    /// Registered type name, e.g. `double_top_bottom`.
    fn name(&self) -> &str;

    fn config(&self) -> &StrategyConfig;

    /// Replace the configuration with `options` applied onto this strategy's defaults.
    ///
    /// On error the previous configuration is kept.
    fn configure(&mut self, options: &BTreeMap<String, f64>) -> Result<(), ConfigError>;

    /// Pure function of `bars` and the configuration.
    fn calculate_indicators(&self, bars: &[Bar]) -> IndicatorState;

    /// Decision rule. Never fails; no patterns means an all-false series.
    fn generate_signals(&self, bars: &[Bar], state: &IndicatorState) -> SignalSeries;

    /// Validate bars, derive state and signals, then simulate.
    fn backtest(&self, bars: &[Bar]) -> Result<BacktestOutcome, BacktestError> {
        validate_bars(bars)?;

        let state = self.calculate_indicators(bars);
        if let Some(short) = state.insufficient_data {
            warn!(
                strategy = self.name(),
                bars = short.bars,
                required = short.required,
                "{short}"
            );
        }

        let signals = self.generate_signals(bars, &state);
        if !signals.conflicts().is_empty() {
            warn!(
                strategy = self.name(),
                conflicts = ?signals.conflicts(),
                "dropped bars with both buy and sell signals"
            );
        }

        let simulation = simulate_signals(bars, &signals, &self.config().portfolio)?;
        info!(
            strategy = self.name(),
            bars = bars.len(),
            patterns = state.patterns.len(),
            buys = signals.buy_count(),
            sells = signals.sell_count(),
            trades = simulation.metrics.trade_count,
            total_profit_pct = simulation.metrics.total_profit_pct,
            "backtest complete"
        );

        Ok(BacktestOutcome {
            state,
            signals,
            simulation,
        })
    }
}

/// Shared indicator pass: detect extrema and match the requested pattern kinds.
pub fn detect_patterns(
    bars: &[Bar],
    config: &StrategyConfig,
    kinds: &[PatternKind],
) -> IndicatorState {
    let insufficient_data = config.detector.check_len(bars.len());
    if insufficient_data.is_some() {
        return IndicatorState {
            insufficient_data,
            ..IndicatorState::default()
        };
    }

    let extrema = config.detector.detect(bars);
    let mut patterns: Vec<PatternEvent> = kinds
        .iter()
        .flat_map(|&kind| find_patterns_of_kind(kind, &extrema, bars, &config.matching))
        .collect();
    patterns.sort_by_key(|e| (e.confirmation_index, e.second_extremum.index, e.kind));

    IndicatorState {
        extrema,
        patterns,
        insufficient_data: None,
    }
}
