//! PatternLab Runner — backtest orchestration on top of `patternlab-core`.
//!
//! This crate provides:
//! - TOML backtest configuration with strict key checking
//! - Data loading through a `BarProvider` with synthetic fallback and dataset hashing
//! - Single-run and detection-only entry points
//! - Parallel batch runs over many configs
//! - JSON / CSV / Markdown artifact export

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use batch::{load_batch_dir, run_batch, BatchJob, BatchOutcome};
pub use config::{BacktestConfig, BacktestSection, ConfigError, StrategySection};
pub use data_loader::{
    compute_dataset_hash, generate_synthetic_bars, load_bars, LoadError, LoadOptions, LoadedData,
};
pub use export::{
    export_batch_summary_csv, export_equity_csv, export_json, export_patterns_csv,
    export_signals_csv, export_trades_csv, generate_report, import_json, load_artifacts,
    save_artifacts,
};
pub use runner::{
    run_backtest_on_bars, run_detection, run_single_backtest, BacktestResult, DetectionResult,
    RunError, SCHEMA_VERSION,
};
