//! Backtest runner — wires together config, data loading, strategy and simulation.
//!
//! Entry points:
//! - `run_single_backtest()`: loads data through a provider, then runs. Used by the CLI.
//! - `run_backtest_on_bars()`: takes pre-loaded data. Used by batch runs and tests.
//! - `run_detection()`: pattern detection only, no simulation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use patternlab_core::data::{BarProvider, DataSource, Timeframe};
use patternlab_core::domain::{
    EquityPoint, OpenPosition, PatternEvent, PatternKind, SignalSeries, Trade,
};
use patternlab_core::portfolio::PerformanceMetrics;
use patternlab_core::strategy::{BacktestError, IndicatorState, StrategyConfig};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_bars, LoadError, LoadOptions, LoadedData};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub strategy: String,
    /// Options exactly as supplied.
    pub params: BTreeMap<String, f64>,
    /// Options resolved onto the strategy defaults.
    pub config: StrategyConfig,
    pub config_hash: String,
    pub dataset_hash: String,
    pub data_source: DataSource,
    pub bar_count: usize,
    pub first_bar: Option<DateTime<Utc>>,
    pub last_bar: Option<DateTime<Utc>>,
    pub warnings: Vec<String>,
    pub patterns: Vec<PatternEvent>,
    pub signals: SignalSeries,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: PerformanceMetrics,
    pub open_position: Option<OpenPosition>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn is_synthetic(&self) -> bool {
        self.data_source == DataSource::Synthetic
    }

    pub fn initial_capital(&self) -> f64 {
        self.config.portfolio.initial_capital
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map_or(self.initial_capital(), |p| p.equity)
    }

    pub fn pattern_count(&self, kind: PatternKind) -> usize {
        self.patterns.iter().filter(|p| p.kind == kind).count()
    }
}

/// Pattern detection output without a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub strategy: String,
    pub dataset_hash: String,
    pub data_source: DataSource,
    pub bar_count: usize,
    pub peak_count: usize,
    pub trough_count: usize,
    pub patterns: Vec<PatternEvent>,
    pub warnings: Vec<String>,
}

/// Load data through `provider` and run one backtest.
pub fn run_single_backtest(
    config: &BacktestConfig,
    provider: Option<&dyn BarProvider>,
    opts: &LoadOptions,
) -> Result<BacktestResult, RunError> {
    let loaded = load_bars(&config.query(), provider, opts)?;
    run_backtest_on_bars(config, &loaded)
}

/// Run a backtest on pre-loaded data without any I/O.
pub fn run_backtest_on_bars(
    config: &BacktestConfig,
    loaded: &LoadedData,
) -> Result<BacktestResult, RunError> {
    let strategy = config.build_strategy()?;
    let config_hash = config.config_hash()?;
    let outcome = strategy.backtest(&loaded.bars)?;

    let mut warnings = data_warnings(loaded, &outcome.state);
    warnings.extend(outcome.signals.conflicts().iter().map(|i| {
        format!("buy and sell signals coincide at bar {i}; both dropped")
    }));
    if let Some(open) = &outcome.simulation.open_position {
        warnings.push(format!(
            "position opened at bar {} left open at end of series (unrealized {:.2})",
            open.entry_index, open.unrealized_pnl
        ));
    }

    let simulation = outcome.simulation;
    info!(
        symbol = %loaded.symbol,
        timeframe = %loaded.timeframe,
        strategy = strategy.name(),
        trades = simulation.trades.len(),
        warnings = warnings.len(),
        "run complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        symbol: loaded.symbol.clone(),
        timeframe: loaded.timeframe,
        strategy: strategy.name().to_string(),
        params: config.strategy.params.clone(),
        config: *strategy.config(),
        config_hash,
        dataset_hash: loaded.dataset_hash.clone(),
        data_source: loaded.source,
        bar_count: loaded.bars.len(),
        first_bar: loaded.bars.first().map(|b| b.timestamp),
        last_bar: loaded.bars.last().map(|b| b.timestamp),
        warnings,
        patterns: outcome.state.patterns,
        signals: outcome.signals,
        trades: simulation.trades,
        equity_curve: simulation.equity_curve,
        metrics: simulation.metrics,
        open_position: simulation.open_position,
    })
}

/// Detect extrema and patterns for the configured strategy on pre-loaded data.
pub fn run_detection(
    config: &BacktestConfig,
    loaded: &LoadedData,
) -> Result<DetectionResult, RunError> {
    let strategy = config.build_strategy()?;
    patternlab_core::data::validate_bars(&loaded.bars)
        .map_err(|e| RunError::Backtest(e.into()))?;
    let state = strategy.calculate_indicators(&loaded.bars);

    Ok(DetectionResult {
        symbol: loaded.symbol.clone(),
        timeframe: loaded.timeframe,
        strategy: strategy.name().to_string(),
        dataset_hash: loaded.dataset_hash.clone(),
        data_source: loaded.source,
        bar_count: loaded.bars.len(),
        peak_count: state.extrema.peaks.len(),
        trough_count: state.extrema.troughs.len(),
        warnings: data_warnings(loaded, &state),
        patterns: state.patterns,
    })
}

fn data_warnings(loaded: &LoadedData, state: &IndicatorState) -> Vec<String> {
    let mut warnings = Vec::new();
    if loaded.is_synthetic() {
        warnings.push("synthetic data: results are not from market bars".to_string());
    }
    if let Some(short) = state.insufficient_data {
        warnings.push(short.to_string());
    }
    warnings
}
