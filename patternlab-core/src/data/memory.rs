use std::collections::HashMap;

use super::provider::{BarProvider, BarQuery, DataError, DataSource, FetchResult, RawBar, Timeframe};
use crate::domain::Bar;

/// Fixture provider serving bars held in memory, keyed by symbol and timeframe.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBarProvider {
    series: HashMap<(String, Timeframe), Vec<RawBar>>,
}

impl InMemoryBarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, timeframe: Timeframe, bars: Vec<RawBar>) {
        self.series.insert((symbol.to_uppercase(), timeframe), bars);
    }

    /// Insert already-validated bars.
    pub fn insert_bars(&mut self, symbol: &str, timeframe: Timeframe, bars: &[Bar]) {
        let raw = bars
            .iter()
            .map(|b| RawBar {
                timestamp: b.timestamp,
                open: Some(b.open),
                high: Some(b.high),
                low: Some(b.low),
                close: Some(b.close),
                volume: Some(b.volume),
            })
            .collect();
        self.insert(symbol, timeframe, raw);
    }
}

impl BarProvider for InMemoryBarProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, query: &BarQuery) -> Result<FetchResult, DataError> {
        let symbol = query.symbol.to_uppercase();
        let bars = self
            .series
            .get(&(symbol.clone(), query.timeframe))
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.clone(),
                timeframe: query.timeframe,
            })?;
        Ok(FetchResult {
            symbol,
            timeframe: query.timeframe,
            bars: query.apply(bars.clone()),
            source: DataSource::InMemory,
        })
    }
}
