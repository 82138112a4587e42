//! Factory — converts a strategy type name and option map into a configured trait object.

use std::collections::BTreeMap;

use super::{
    double_bottom_only, double_top_bottom, ConfigError, DoubleBottomOnlyStrategy,
    DoubleTopBottomStrategy, Strategy,
};

/// Registered strategy type names.
pub const STRATEGY_TYPES: &[&str] = &[double_top_bottom::NAME, double_bottom_only::NAME];

/// Create a configured strategy from its type name.
pub fn create_strategy(
    strategy_type: &str,
    params: &BTreeMap<String, f64>,
) -> Result<Box<dyn Strategy>, ConfigError> {
    match strategy_type {
        double_top_bottom::NAME => Ok(Box::new(DoubleTopBottomStrategy::with_params(params)?)),
        double_bottom_only::NAME => Ok(Box::new(DoubleBottomOnlyStrategy::with_params(params)?)),
        other => Err(ConfigError::UnknownStrategy(other.to_string())),
    }
}
