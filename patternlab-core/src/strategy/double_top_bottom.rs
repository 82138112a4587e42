//! Buy on double-bottom confirmations, sell on double-top confirmations.

use std::collections::BTreeMap;

use super::{detect_patterns, ConfigError, IndicatorState, Strategy, StrategyConfig};
use crate::domain::{Bar, PatternKind, SignalSeries};

pub const NAME: &str = "double_top_bottom";

#[derive(Debug, Clone, Default)]
pub struct DoubleTopBottomStrategy {
    config: StrategyConfig,
}

impl DoubleTopBottomStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build with `options` applied onto the defaults.
    pub fn with_params(options: &BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        let mut strategy = Self::new();
        strategy.configure(options)?;
        Ok(strategy)
    }
}

impl Strategy for DoubleTopBottomStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn configure(&mut self, options: &BTreeMap<String, f64>) -> Result<(), ConfigError> {
        self.config = StrategyConfig::from_params(NAME, options, StrategyConfig::default(), &[])?;
        Ok(())
    }

    fn calculate_indicators(&self, bars: &[Bar]) -> IndicatorState {
        detect_patterns(
            bars,
            &self.config,
            &[PatternKind::DoubleTop, PatternKind::DoubleBottom],
        )
    }

    fn generate_signals(&self, bars: &[Bar], state: &IndicatorState) -> SignalSeries {
        let buys = state
            .patterns_of(PatternKind::DoubleBottom)
            .map(|p| p.confirmation_index);
        let sells = state
            .patterns_of(PatternKind::DoubleTop)
            .map(|p| p.confirmation_index);
        SignalSeries::from_indices(bars.len(), buys, sells)
    }
}
