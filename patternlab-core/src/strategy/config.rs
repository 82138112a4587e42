//! Validated strategy configuration built from a flat option map.
//!
//! Options arrive as `BTreeMap<String, f64>` (TOML `[strategy.params]`, CLI
//! `--param key=value`). Every key must be recognized; every value is range
//! checked. Anything not supplied keeps its documented default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::patterns::{ExtremumDetector, OverlapPolicy, PatternMatchConfig};
use crate::portfolio::{EndOfSeriesPolicy, PortfolioConfig};

/// Options understood by every built-in strategy.
pub const COMMON_OPTIONS: &[&str] = &[
    "tolerance",
    "min_bars_between",
    "max_bars_between",
    "peak_order",
    "trough_order",
    "max_confirmation_bars",
    "overlap_policy",
    "initial_capital",
    "position_sizing",
    "stop_loss_pct",
    "take_profit_pct",
    "annualization_factor",
    "close_at_end",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown option '{option}' for strategy '{strategy}'")]
    UnknownOption { strategy: String, option: String },

    #[error("unknown strategy type: {0}")]
    UnknownStrategy(String),

    #[error("option '{option}' = {value} is out of range (expected {expected})")]
    OutOfRange {
        option: String,
        value: f64,
        expected: &'static str,
    },

    #[error("option '{option}' must be a whole number, got {value}")]
    NotInteger { option: String, value: f64 },
}

/// Everything a pattern strategy needs: detection, matching and simulation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub detector: ExtremumDetector,
    pub matching: PatternMatchConfig,
    pub portfolio: PortfolioConfig,
}

impl StrategyConfig {
    /// Apply `params` onto `defaults`.
    ///
    /// `extra` lists strategy-specific keys that are accepted here and read
    /// by the strategy itself.
    pub fn from_params(
        strategy: &str,
        params: &BTreeMap<String, f64>,
        defaults: StrategyConfig,
        extra: &[&str],
    ) -> Result<Self, ConfigError> {
        if let Some(option) = params
            .keys()
            .find(|k| !COMMON_OPTIONS.contains(&k.as_str()) && !extra.contains(&k.as_str()))
        {
            return Err(ConfigError::UnknownOption {
                strategy: strategy.to_string(),
                option: option.clone(),
            });
        }

        let mut cfg = defaults;
        let p = Params(params);

        if let Some(t) = p.get("tolerance") {
            cfg.matching.tolerance =
                check(t, "tolerance", "0 < tolerance < 1", |v| v > 0.0 && v < 1.0)?;
        }
        if let Some(n) = p.whole("min_bars_between")? {
            cfg.matching.min_bars_between = n;
        }
        if let Some(n) = p.whole("max_bars_between")? {
            cfg.matching.max_bars_between = n;
        }
        if cfg.matching.max_bars_between < cfg.matching.min_bars_between {
            return Err(ConfigError::OutOfRange {
                option: "max_bars_between".into(),
                value: cfg.matching.max_bars_between as f64,
                expected: ">= min_bars_between",
            });
        }
        if let Some(n) = p.whole("peak_order")? {
            cfg.detector.peak_order = n;
        }
        if let Some(n) = p.whole("trough_order")? {
            cfg.detector.trough_order = n;
        }
        if let Some(n) = p.whole("max_confirmation_bars")? {
            cfg.matching.max_confirmation_bars = Some(n);
        }
        if let Some(flag) = p.flag("overlap_policy")? {
            cfg.matching.overlap_policy = if flag {
                OverlapPolicy::KeepAll
            } else {
                OverlapPolicy::EarliestConfirmed
            };
        }

        if let Some(c) = p.get("initial_capital") {
            cfg.portfolio.initial_capital =
                check(c, "initial_capital", "> 0", |v| v > 0.0 && v.is_finite())?;
        }
        if let Some(f) = p.get("position_sizing") {
            cfg.portfolio.position_sizing = check(
                f,
                "position_sizing",
                "0 < position_sizing <= 1",
                |v| v > 0.0 && v <= 1.0,
            )?;
        }
        if let Some(s) = p.get("stop_loss_pct") {
            cfg.portfolio.stop_loss_pct = Some(check(
                s,
                "stop_loss_pct",
                "0 < stop_loss_pct < 1",
                |v| v > 0.0 && v < 1.0,
            )?);
        }
        if let Some(t) = p.get("take_profit_pct") {
            cfg.portfolio.take_profit_pct =
                Some(check(t, "take_profit_pct", "> 0", |v| v > 0.0 && v.is_finite())?);
        }
        if let Some(a) = p.get("annualization_factor") {
            cfg.portfolio.annualization_factor =
                check(a, "annualization_factor", "> 0", |v| v > 0.0 && v.is_finite())?;
        }
        if let Some(flag) = p.flag("close_at_end")? {
            cfg.portfolio.end_of_series = if flag {
                EndOfSeriesPolicy::ForceClose
            } else {
                EndOfSeriesPolicy::LeaveOpen
            };
        }

        Ok(cfg)
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn check(
    value: f64,
    option: &str,
    expected: &'static str,
    ok: impl Fn(f64) -> bool,
) -> Result<f64, ConfigError> {
    if ok(value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            option: option.to_string(),
            value,
            expected,
        })
    }
}

/// Largest accepted bar count or window option.
pub const MAX_WHOLE: u32 = u32::MAX;

/// Typed reads over the raw option map.
pub(crate) struct Params<'a>(pub(crate) &'a BTreeMap<String, f64>);

impl Params<'_> {
    pub(crate) fn get(&self, option: &str) -> Option<f64> {
        self.0.get(option).copied()
    }

    /// Whole number in `1..=MAX_WHOLE`.
    pub(crate) fn whole(&self, option: &str) -> Result<Option<usize>, ConfigError> {
        let Some(value) = self.get(option) else {
            return Ok(None);
        };
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(ConfigError::NotInteger {
                option: option.to_string(),
                value,
            });
        }
        if value < 1.0 {
            return Err(ConfigError::OutOfRange {
                option: option.to_string(),
                value,
                expected: ">= 1",
            });
        }
        if value > MAX_WHOLE as f64 {
            return Err(ConfigError::OutOfRange {
                option: option.to_string(),
                value,
                expected: "<= 4294967295",
            });
        }
        Ok(Some(value as usize))
    }

    /// `0` or `1`.
    pub(crate) fn flag(&self, option: &str) -> Result<Option<bool>, ConfigError> {
        match self.get(option) {
            None => Ok(None),
            Some(v) if v == 0.0 => Ok(Some(false)),
            Some(v) if v == 1.0 => Ok(Some(true)),
            Some(value) => Err(ConfigError::OutOfRange {
                option: option.to_string(),
                value,
                expected: "0 or 1",
            }),
        }
    }
}
