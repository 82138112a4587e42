//! Parallel batch runner — independent backtests on a rayon pool.
//!
//! Each job is one `BacktestConfig`. Jobs share nothing but the read-only
//! provider; one job failing never affects the others, and results come back
//! in job order.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use patternlab_core::data::BarProvider;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::LoadOptions;
use crate::runner::{run_single_backtest, BacktestResult, RunError};

#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Label used in summaries, usually the config file stem.
    pub name: String,
    pub config: BacktestConfig,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub name: String,
    pub result: Result<BacktestResult, RunError>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run every job in parallel. Output order matches `jobs`.
pub fn run_batch(
    jobs: &[BatchJob],
    provider: Option<&dyn BarProvider>,
    opts: &LoadOptions,
) -> Vec<BatchOutcome> {
    info!(jobs = jobs.len(), threads = rayon::current_num_threads(), "starting batch");

    let outcomes: Vec<BatchOutcome> = jobs
        .par_iter()
        .map(|job| {
            let result = run_single_backtest(&job.config, provider, opts);
            if let Err(e) = &result {
                warn!(job = %job.name, error = %e, "batch job failed");
            }
            BatchOutcome {
                name: job.name.clone(),
                result,
            }
        })
        .collect();

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!(succeeded = outcomes.len() - failed, failed, "batch complete");
    outcomes
}

/// One job per `*.toml` file in `dir`, sorted by file name.
///
/// Fails on the first file that does not parse.
pub fn load_batch_dir(dir: &Path) -> Result<Vec<BatchJob>, ConfigError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(BatchJob {
                name,
                config: BacktestConfig::from_file(path)?,
            })
        })
        .collect()
}
