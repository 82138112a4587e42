//! PatternLab CLI — backtest, detection and batch commands.
//!
//! Commands:
//! - `run` — backtest one strategy from a TOML config or command-line flags
//! - `detect` — list confirmed double tops / bottoms without simulating
//! - `batch` — run every `*.toml` config in a directory in parallel
//! - `strategies` — list registered strategy types and their options
//!
//! Bars come from a CSV export directory (`--csv-dir`), the chart-data HTTP
//! API (`--api-url`), or a seeded random walk (`--synthetic`).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use patternlab_core::data::{parse_timestamp, BarProvider, CsvBarProvider, HttpBarProvider, Timeframe};
use patternlab_core::strategy::{COMMON_OPTIONS, STRATEGY_TYPES};
use patternlab_runner::{
    export_batch_summary_csv, load_bars, load_batch_dir, run_batch, run_detection,
    run_single_backtest, save_artifacts, BacktestConfig, BacktestResult, DetectionResult,
    LoadOptions,
};

#[derive(Parser)]
#[command(
    name = "patternlab",
    about = "PatternLab CLI — double top / double bottom detection and backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one strategy.
    Run {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// Output directory for the artifact bundle.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Detect confirmed patterns without simulating trades.
    Detect {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// Print the detection result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run every *.toml config in a directory in parallel.
    Batch {
        /// Directory of backtest configs.
        #[arg(long)]
        dir: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        /// Output directory for per-run artifacts and summary.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// List strategy types and recognized options.
    Strategies,
}

/// What to backtest: a config file, flags, or a config file overridden by flags.
#[derive(Args)]
struct TargetArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbol, e.g. XAUUSD (required without --config).
    #[arg(long)]
    symbol: Option<String>,

    /// Timeframe: 1min, 5min, 15min, 30min, 1H, 4H, 1D.
    #[arg(long)]
    timeframe: Option<Timeframe>,

    /// Strategy type (default double_top_bottom).
    #[arg(long)]
    strategy: Option<String>,

    /// Strategy option, repeatable: --param tolerance=0.03
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, f64)>,

    /// First bar (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_parser = parse_time)]
    start: Option<DateTime<Utc>>,

    /// Last bar (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_parser = parse_time)]
    end: Option<DateTime<Utc>>,

    /// Keep only the most recent N bars.
    #[arg(long)]
    limit: Option<usize>,
}

/// Where bars come from.
#[derive(Args)]
struct SourceArgs {
    /// Directory of {SYMBOL}_{timeframe}.csv exports.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Base URL of the chart-data API, e.g. http://localhost:8000
    #[arg(long)]
    api_url: Option<String>,

    /// Use synthetic data when no provider is given or the fetch fails.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "patternlab=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            target,
            source,
            output_dir,
            no_save,
        } => run_backtest_cmd(&target, &source, &output_dir, no_save),
        Commands::Detect {
            target,
            source,
            json,
        } => run_detect_cmd(&target, &source, json),
        Commands::Batch {
            dir,
            source,
            output_dir,
        } => run_batch_cmd(&dir, &source, &output_dir),
        Commands::Strategies => {
            print_strategies();
            Ok(())
        }
    }
}

fn run_backtest_cmd(
    target: &TargetArgs,
    source: &SourceArgs,
    output_dir: &Path,
    no_save: bool,
) -> Result<()> {
    let config = build_config(target)?;
    let provider = build_provider(source)?;
    let opts = LoadOptions {
        synthetic: source.synthetic,
    };

    let result = run_single_backtest(&config, provider.as_deref(), &opts)?;
    print_summary(&result);

    if !no_save {
        let run_dir = save_artifacts(&result, output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_detect_cmd(target: &TargetArgs, source: &SourceArgs, json: bool) -> Result<()> {
    let config = build_config(target)?;
    let provider = build_provider(source)?;
    let opts = LoadOptions {
        synthetic: source.synthetic,
    };

    let loaded = load_bars(&config.query(), provider.as_deref(), &opts)?;
    let detection = run_detection(&config, &loaded)?;

    if json {
        let text = serde_json::to_string_pretty(&detection)
            .context("failed to serialize detection result")?;
        println!("{text}");
    } else {
        print_detection(&detection);
    }
    Ok(())
}

fn run_batch_cmd(dir: &Path, source: &SourceArgs, output_dir: &Path) -> Result<()> {
    let jobs = load_batch_dir(dir)?;
    if jobs.is_empty() {
        bail!("no *.toml configs found in {}", dir.display());
    }
    let provider = build_provider(source)?;
    let opts = LoadOptions {
        synthetic: source.synthetic,
    };

    let outcomes = run_batch(&jobs, provider.as_deref(), &opts);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(result) => {
                let run_dir = save_artifacts(result, output_dir)?;
                println!(
                    "{:<24} {:>4} trades {:>9.2}%  -> {}",
                    outcome.name,
                    result.metrics.trade_count,
                    result.metrics.total_profit_pct,
                    run_dir.display()
                );
            }
            Err(e) => println!("{:<24} FAILED: {e}", outcome.name),
        }
    }

    let summary_path = output_dir.join("summary.csv");
    std::fs::write(&summary_path, export_batch_summary_csv(&outcomes)?)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;
    info!(path = %summary_path.display(), "wrote batch summary");

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        bail!("{failed} of {} batch jobs failed", outcomes.len());
    }
    Ok(())
}

/// Config file (if any) with command-line flags layered on top.
fn build_config(target: &TargetArgs) -> Result<BacktestConfig> {
    let mut config = match &target.config {
        Some(path) => BacktestConfig::from_file(path)?,
        None => {
            let Some(symbol) = &target.symbol else {
                bail!("--symbol is required without --config");
            };
            let Some(timeframe) = target.timeframe else {
                bail!("--timeframe is required without --config");
            };
            let strategy = target.strategy.as_deref().unwrap_or("double_top_bottom");
            BacktestConfig::new(symbol.clone(), timeframe, strategy)
        }
    };

    if let Some(symbol) = &target.symbol {
        config.backtest.symbol = symbol.clone();
    }
    if let Some(timeframe) = target.timeframe {
        config.backtest.timeframe = timeframe;
    }
    if let Some(strategy) = &target.strategy {
        config.strategy.strategy_type = strategy.clone();
    }
    if target.start.is_some() {
        config.backtest.start = target.start;
    }
    if target.end.is_some() {
        config.backtest.end = target.end;
    }
    if target.limit.is_some() {
        config.backtest.limit = target.limit;
    }
    config.strategy.params.extend(target.params.iter().cloned());

    config.validate()?;
    Ok(config)
}

fn build_provider(source: &SourceArgs) -> Result<Option<Box<dyn BarProvider>>> {
    match (&source.csv_dir, &source.api_url) {
        (Some(_), Some(_)) => bail!("--csv-dir and --api-url are mutually exclusive"),
        (Some(dir), None) => Ok(Some(Box::new(CsvBarProvider::new(dir)))),
        (None, Some(url)) => Ok(Some(Box::new(HttpBarProvider::new(url.as_str())?))),
        (None, None) if source.synthetic => Ok(None),
        (None, None) => bail!("one of --csv-dir, --api-url or --synthetic is required"),
    }
}

fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    Ok((key.trim().to_string(), value))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(s).ok_or_else(|| format!("unrecognized timestamp '{s}'"))
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {} ({})", result.symbol, result.timeframe);
    println!("Strategy:       {}", result.strategy);
    if let (Some(first), Some(last)) = (result.first_bar, result.last_bar) {
        println!("Period:         {} to {}", first.to_rfc3339(), last.to_rfc3339());
    }
    println!("Bars:           {}", result.bar_count);
    println!("Patterns:       {}", result.patterns.len());
    println!(
        "Signals:        {} buy / {} sell",
        result.signals.buy_count(),
        result.signals.sell_count()
    );
    println!("Trades:         {}", m.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Total Profit:   {:.2}% ({:.2})", m.total_profit_pct, m.total_profit_usd);
    println!("Final Equity:   {:.2}", result.final_equity());
    println!("Win Rate:       {:.1}%", m.win_rate_pct);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown_pct);
    if m.profit_factor.is_infinite() {
        println!("Profit Factor:  inf");
    } else {
        println!("Profit Factor:  {:.2}", m.profit_factor);
    }
    println!("Avg Return:     {:.2}% per trade", m.avg_return_per_trade_pct);
    if result.is_synthetic() {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    for warn in &result.warnings {
        println!("WARNING: {warn}");
    }
    println!();
}

fn print_detection(detection: &DetectionResult) {
    println!();
    println!("=== Pattern Detection ===");
    println!("Symbol:         {} ({})", detection.symbol, detection.timeframe);
    println!("Strategy:       {}", detection.strategy);
    println!("Bars:           {}", detection.bar_count);
    println!(
        "Extrema:        {} peaks / {} troughs",
        detection.peak_count, detection.trough_count
    );
    println!("Patterns:       {}", detection.patterns.len());
    println!();
    for p in &detection.patterns {
        println!(
            "{:<14} bars {:>5}/{:>5}/{:>5}  confirmed {:>5} @ {}  breakout {:.4}  target {:.4}",
            p.kind.as_str(),
            p.first_extremum.index,
            p.intervening_extremum.index,
            p.second_extremum.index,
            p.confirmation_index,
            p.confirmation_time.format("%Y-%m-%d %H:%M"),
            p.breakout_price,
            p.target_price()
        );
    }
    for warn in &detection.warnings {
        println!("WARNING: {warn}");
    }
    println!();
}

fn print_strategies() {
    println!("Strategy types:");
    for name in STRATEGY_TYPES {
        println!("  {name}");
    }
    println!();
    println!("Common options (--param key=value or [strategy.params]):");
    for option in COMMON_OPTIONS {
        println!("  {option}");
    }
    println!();
    println!("double_bottom_only also accepts: hold_bars");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_param_pairs() {
        assert_eq!(
            parse_param("tolerance=0.03").unwrap(),
            ("tolerance".to_string(), 0.03)
        );
        assert_eq!(
            parse_param(" peak_order = 4 ").unwrap(),
            ("peak_order".to_string(), 4.0)
        );
        assert!(parse_param("tolerance").is_err());
        assert!(parse_param("tolerance=abc").is_err());
    }

    #[test]
    fn parses_dates_and_rfc3339() {
        assert!(parse_time("2024-01-02").is_ok());
        assert!(parse_time("2024-01-02T09:30:00Z").is_ok());
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_build_config_without_file() {
        let cli = Cli::try_parse_from([
            "patternlab",
            "run",
            "--symbol",
            "XAUUSD",
            "--timeframe",
            "4H",
            "--param",
            "tolerance=0.03",
            "--synthetic",
        ])
        .unwrap();
        let Commands::Run { target, source, .. } = cli.command else {
            panic!("expected run");
        };
        let config = build_config(&target).unwrap();
        assert_eq!(config.backtest.timeframe, Timeframe::Hour4);
        assert_eq!(config.strategy.strategy_type, "double_top_bottom");
        assert_eq!(config.strategy.params.get("tolerance"), Some(&0.03));
        assert!(build_provider(&source).unwrap().is_none());
    }

    #[test]
    fn rejects_missing_source() {
        let source = SourceArgs {
            csv_dir: None,
            api_url: None,
            synthetic: false,
        };
        assert!(build_provider(&source).is_err());
    }
}
