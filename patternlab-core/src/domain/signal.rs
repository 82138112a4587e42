//! Buy/sell signal sequences aligned to the bar index.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("signal length mismatch: buy has {buy} entries, sell has {sell}, bars have {bars}")]
    LengthMismatch { buy: usize, sell: usize, bars: usize },

    #[error("buy and sell both set at bar {index}")]
    Conflict { index: usize },
}

/// Two boolean sequences of bar length with at most one flag set per index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    buy: Vec<bool>,
    sell: Vec<bool>,
    /// Indices where both a buy and a sell were requested and both were dropped.
    conflicts: Vec<usize>,
}

impl SignalSeries {
    /// All-false series of the given length.
    pub fn flat(len: usize) -> Self {
        Self {
            buy: vec![false; len],
            sell: vec![false; len],
            conflicts: Vec::new(),
        }
    }

    /// Build from raw vectors, rejecting mismatched lengths and simultaneous flags.
    pub fn new(buy: Vec<bool>, sell: Vec<bool>) -> Result<Self, SignalError> {
        check_signals(&buy, &sell, buy.len())?;
        Ok(Self {
            buy,
            sell,
            conflicts: Vec::new(),
        })
    }

    /// Build from event indices. An index present in both sets is dropped from
    /// both and recorded in [`conflicts`](Self::conflicts); indices outside
    /// `0..len` are ignored.
    pub fn from_indices(
        len: usize,
        buy_indices: impl IntoIterator<Item = usize>,
        sell_indices: impl IntoIterator<Item = usize>,
    ) -> Self {
        let mut series = Self::flat(len);
        for i in buy_indices.into_iter().filter(|&i| i < len) {
            series.buy[i] = true;
        }
        for i in sell_indices.into_iter().filter(|&i| i < len) {
            series.sell[i] = true;
        }
        for i in 0..len {
            if series.buy[i] && series.sell[i] {
                series.buy[i] = false;
                series.sell[i] = false;
                series.conflicts.push(i);
            }
        }
        series
    }

    pub fn buy(&self) -> &[bool] {
        &self.buy
    }

    pub fn sell(&self) -> &[bool] {
        &self.sell
    }

    pub fn conflicts(&self) -> &[usize] {
        &self.conflicts
    }

    pub fn len(&self) -> usize {
        self.buy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buy.is_empty()
    }

    pub fn buy_count(&self) -> usize {
        self.buy.iter().filter(|&&b| b).count()
    }

    pub fn sell_count(&self) -> usize {
        self.sell.iter().filter(|&&s| s).count()
    }
}

/// Check that both sequences have `bars` entries and never flag the same index.
pub fn check_signals(buy: &[bool], sell: &[bool], bars: usize) -> Result<(), SignalError> {
    if buy.len() != bars || sell.len() != bars {
        return Err(SignalError::LengthMismatch {
            buy: buy.len(),
            sell: sell.len(),
            bars,
        });
    }
    match buy.iter().zip(sell).position(|(&b, &s)| b && s) {
        Some(index) => Err(SignalError::Conflict { index }),
        None => Ok(()),
    }
}
