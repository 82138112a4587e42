//! Bar loading and provenance for the runner.
//!
//! Fallback policy:
//! 1. Provider available and the fetch succeeds → ingest its bars
//! 2. Otherwise, if `synthetic` is set → generate a seeded random walk (tagged)
//! 3. Otherwise → fail with the provider error
//!
//! Synthetic data is a developer-only mode. Results produced on it carry
//! `DataSource::Synthetic` and a warning.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{info, warn};

use patternlab_core::data::{
    ingest, BarProvider, BarQuery, DataError, DataQualityError, DataSource, RawBar, Timeframe,
};
use patternlab_core::domain::Bar;

/// Synthetic series length when the query sets no limit.
pub const DEFAULT_SYNTHETIC_BARS: usize = 1000;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no data provider configured for '{symbol}' (use --synthetic for synthetic data)")]
    NoProvider { symbol: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("data quality: {0}")]
    Quality(#[from] DataQualityError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Generate synthetic bars when the provider is missing or fails.
    pub synthetic: bool,
}

/// Validated bars plus where they came from.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over every bar's timestamp and OHLCV values.
    pub dataset_hash: String,
}

impl LoadedData {
    /// Wrap bars that are already validated, e.g. handed in by a test or bench.
    pub fn from_bars(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        bars: Vec<Bar>,
        source: DataSource,
    ) -> Self {
        let dataset_hash = compute_dataset_hash(&bars);
        Self {
            symbol: symbol.into(),
            timeframe,
            bars,
            source,
            dataset_hash,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

/// Load and validate bars for one query.
pub fn load_bars(
    query: &BarQuery,
    provider: Option<&dyn BarProvider>,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    let fetched = match provider {
        Some(p) => Some(p.fetch(query).map_err(|e| (p.name().to_string(), e))),
        None => None,
    };

    let (raw, source) = match fetched {
        Some(Ok(result)) => (result.bars, result.source),
        Some(Err((name, err))) if opts.synthetic => {
            warn!(provider = %name, error = %err, "fetch failed, falling back to synthetic data");
            (generate_synthetic_bars(query), DataSource::Synthetic)
        }
        Some(Err((_, err))) => return Err(err.into()),
        None if opts.synthetic => {
            warn!(symbol = %query.symbol, "generating synthetic data; results will be tagged");
            (generate_synthetic_bars(query), DataSource::Synthetic)
        }
        None => {
            return Err(LoadError::NoProvider {
                symbol: query.symbol.clone(),
            })
        }
    };

    let bars = ingest(raw)?;
    info!(
        symbol = %query.symbol,
        timeframe = %query.timeframe,
        bars = bars.len(),
        source = ?source,
        "loaded bars"
    );
    Ok(LoadedData::from_bars(
        query.symbol.clone(),
        query.timeframe,
        bars,
        source,
    ))
}

/// Deterministic BLAKE3 hash over all bar data, in series order.
pub fn compute_dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Seeded random walk for the query's symbol and timeframe.
///
/// Starts at `query.start` (or 2024-01-01 UTC), one bar per timeframe step,
/// stops at `query.end` or after `query.limit` bars (default 1000).
pub fn generate_synthetic_bars(query: &BarQuery) -> Vec<RawBar> {
    let seed_input = format!("{}:{}", query.symbol.to_uppercase(), query.timeframe);
    let seed: [u8; 32] = *blake3::hash(seed_input.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let start = query.start.unwrap_or_else(default_synthetic_start);
    let step = chrono::Duration::seconds(query.timeframe.seconds());
    let count = query.limit.unwrap_or(DEFAULT_SYNTHETIC_BARS);

    let mut bars = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    let mut timestamp = start;
    while bars.len() < count && query.end.map_or(true, |end| timestamp <= end) {
        let open = price;
        let close = (open * (1.0 + rng.gen_range(-0.01..0.01))).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
        bars.push(RawBar {
            timestamp,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(rng.gen_range(1_000.0..100_000.0_f64).round()),
        });
        price = close;
        timestamp += step;
    }
    bars
}

fn default_synthetic_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}
