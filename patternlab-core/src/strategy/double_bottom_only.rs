//! Long-only double-bottom strategy with a fixed holding period.
//!
//! Buys at each double-bottom confirmation and schedules a sell `hold_bars`
//! later (clamped to the last bar). A confirmation inside an open holding
//! window, end bar included, is skipped. Stop-loss defaults to 3%.
//! Double tops are never detected.

use std::collections::BTreeMap;

use super::config::Params;
use super::{detect_patterns, ConfigError, IndicatorState, Strategy, StrategyConfig};
use crate::domain::{Bar, PatternKind, SignalSeries};

pub const NAME: &str = "double_bottom_only";
pub const DEFAULT_HOLD_BARS: usize = 20;
pub const DEFAULT_STOP_LOSS_PCT: f64 = 0.03;

#[derive(Debug, Clone)]
pub struct DoubleBottomOnlyStrategy {
    config: StrategyConfig,
    hold_bars: usize,
}

impl Default for DoubleBottomOnlyStrategy {
    fn default() -> Self {
        Self {
            config: Self::defaults(),
            hold_bars: DEFAULT_HOLD_BARS,
        }
    }
}

impl DoubleBottomOnlyStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build with `options` applied onto the defaults.
    pub fn with_params(options: &BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        let mut strategy = Self::new();
        strategy.configure(options)?;
        Ok(strategy)
    }

    pub fn hold_bars(&self) -> usize {
        self.hold_bars
    }

    fn defaults() -> StrategyConfig {
        let mut config = StrategyConfig::default();
        config.portfolio.stop_loss_pct = Some(DEFAULT_STOP_LOSS_PCT);
        config
    }
}

impl Strategy for DoubleBottomOnlyStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn configure(&mut self, options: &BTreeMap<String, f64>) -> Result<(), ConfigError> {
        let config = StrategyConfig::from_params(NAME, options, Self::defaults(), &["hold_bars"])?;
        let hold_bars = Params(options).whole("hold_bars")?.unwrap_or(DEFAULT_HOLD_BARS);
        self.config = config;
        self.hold_bars = hold_bars;
        Ok(())
    }

    fn calculate_indicators(&self, bars: &[Bar]) -> IndicatorState {
        detect_patterns(bars, &self.config, &[PatternKind::DoubleBottom])
    }

    fn generate_signals(&self, bars: &[Bar], state: &IndicatorState) -> SignalSeries {
        let n = bars.len();
        let mut buys = Vec::new();
        let mut sells = Vec::new();
        let mut window_end: Option<usize> = None;

        for event in state.patterns_of(PatternKind::DoubleBottom) {
            let entry = event.confirmation_index;
            if entry >= n || window_end.is_some_and(|end| entry <= end) {
                continue;
            }
            let exit = entry.saturating_add(self.hold_bars).min(n - 1);
            buys.push(entry);
            if exit > entry {
                sells.push(exit);
            }
            window_end = Some(exit);
        }
        SignalSeries::from_indices(n, buys, sells)
    }
}
