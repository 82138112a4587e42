//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape, equity curve, pattern events, signal tape, batch summary
//! - **Markdown**: human-readable single-run report
//!
//! Persisted manifests carry a `schema_version` field. Newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use patternlab_core::domain::{EquityPoint, PatternEvent, PatternKind, Trade};

use crate::batch::BatchOutcome;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade tape.
///
/// Columns: entry_index, entry_time, entry_price, exit_index, exit_time,
/// exit_price, exit_reason, quantity, bars_held, return_pct, profit_pct, profit_usd
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_index",
        "exit_time",
        "exit_price",
        "exit_reason",
        "quantity",
        "bars_held",
        "return_pct",
        "profit_pct",
        "profit_usd",
    ])?;

    for t in trades {
        wtr.write_record([
            t.entry_index.to_string().as_str(),
            &t.entry_time.to_rfc3339(),
            &format!("{:.6}", t.entry_price),
            &t.exit_index.to_string(),
            &t.exit_time.to_rfc3339(),
            &format!("{:.6}", t.exit_price),
            t.exit_reason.as_str(),
            &format!("{:.6}", t.quantity),
            &t.bars_held.to_string(),
            &format!("{:.6}", t.return_pct),
            &format!("{:.4}", t.profit_pct),
            &format!("{:.2}", t.profit_usd),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Equity curve with bar_index, timestamp and equity columns.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "equity"])?;
    for (i, p) in equity_curve.iter().enumerate() {
        wtr.write_record([
            &i.to_string(),
            &p.timestamp.to_rfc3339(),
            &format!("{:.2}", p.equity),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per confirmed pattern, extrema flattened into columns.
pub fn export_patterns_csv(patterns: &[PatternEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "kind",
        "first_index",
        "first_price",
        "intervening_index",
        "intervening_price",
        "second_index",
        "second_price",
        "confirmation_index",
        "confirmation_time",
        "confirmation_close",
        "breakout_price",
        "target_price",
    ])?;
    for p in patterns {
        wtr.write_record([
            p.kind.as_str(),
            &p.first_extremum.index.to_string(),
            &format!("{:.6}", p.first_extremum.price),
            &p.intervening_extremum.index.to_string(),
            &format!("{:.6}", p.intervening_extremum.price),
            &p.second_extremum.index.to_string(),
            &format!("{:.6}", p.second_extremum.price),
            &p.confirmation_index.to_string(),
            &p.confirmation_time.to_rfc3339(),
            &format!("{:.6}", p.confirmation_close),
            &format!("{:.6}", p.breakout_price),
            &format!("{:.6}", p.target_price()),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Signal tape: only bars carrying a buy or sell flag.
///
/// Timestamps come from the equity curve, which has one point per bar.
pub fn export_signals_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "signal"])?;
    let flags = result.signals.buy().iter().zip(result.signals.sell());
    for (i, (&buy, &sell)) in flags.enumerate() {
        let signal = match (buy, sell) {
            (true, _) => "buy",
            (_, true) => "sell",
            _ => continue,
        };
        let Some(point) = result.equity_curve.get(i) else {
            bail!(
                "signal at bar {i} has no equity point (curve has {} points)",
                result.equity_curve.len()
            );
        };
        let timestamp = point.timestamp.to_rfc3339();
        wtr.write_record([i.to_string().as_str(), &timestamp, signal])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per batch job; failed jobs carry their error and empty metrics.
pub fn export_batch_summary_csv(outcomes: &[BatchOutcome]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "job",
        "symbol",
        "timeframe",
        "strategy",
        "patterns",
        "trades",
        "total_profit_pct",
        "win_rate_pct",
        "sharpe_ratio",
        "max_drawdown_pct",
        "profit_factor",
        "error",
    ])?;
    for o in outcomes {
        match &o.result {
            Ok(r) => {
                let m = &r.metrics;
                wtr.write_record([
                    o.name.as_str(),
                    &r.symbol,
                    r.timeframe.as_str(),
                    &r.strategy,
                    &r.patterns.len().to_string(),
                    &m.trade_count.to_string(),
                    &format!("{:.4}", m.total_profit_pct),
                    &format!("{:.2}", m.win_rate_pct),
                    &format!("{:.4}", m.sharpe_ratio),
                    &format!("{:.4}", m.max_drawdown_pct),
                    &format_profit_factor(m.profit_factor),
                    "",
                ])?;
            }
            Err(e) => {
                let error = e.to_string();
                let mut row = vec![o.name.as_str()];
                row.extend(std::iter::repeat("").take(10));
                row.push(&error);
                wtr.write_record(row)?;
            }
        }
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn format_profit_factor(pf: f64) -> String {
    if pf.is_infinite() {
        "inf".to_string()
    } else {
        format!("{pf:.4}")
    }
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates `{symbol}_{timeframe}_{strategy}_{timestamp}/` under `output_dir`
/// containing:
/// - `manifest.json` — the full `BacktestResult`
/// - `trades.csv` — trade tape
/// - `equity.csv` — bar-by-bar equity curve
/// - `patterns.csv` — confirmed pattern events
/// - `signals.csv` — buy/sell tape
/// - `report.md` — Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}_{}_{}",
        result.symbol,
        result.timeframe,
        result.strategy,
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write_file(&run_dir, "manifest.json", &export_json(result)?)?;
    write_file(&run_dir, "trades.csv", &export_trades_csv(&result.trades)?)?;
    write_file(&run_dir, "equity.csv", &export_equity_csv(&result.equity_curve)?)?;
    write_file(&run_dir, "patterns.csv", &export_patterns_csv(&result.patterns)?)?;
    write_file(&run_dir, "signals.csv", &export_signals_csv(result)?)?;
    write_file(&run_dir, "report.md", &generate_report(result))?;

    Ok(run_dir)
}

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    md.push_str(&format!("| Timeframe | {} |\n", result.timeframe));
    md.push_str(&format!("| Strategy | {} |\n", result.strategy));
    if let (Some(first), Some(last)) = (result.first_bar, result.last_bar) {
        md.push_str(&format!(
            "| Period | {} to {} |\n",
            first.to_rfc3339(),
            last.to_rfc3339()
        ));
    }
    md.push_str(&format!("| Bars | {} |\n", result.bar_count));
    md.push_str(&format!(
        "| Initial Capital | ${:.2} |\n",
        result.initial_capital()
    ));
    md.push_str(&format!("| Config Hash | {} |\n", result.config_hash));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.is_synthetic() {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    if !result.params.is_empty() {
        md.push_str("## Parameters\n\n");
        for (key, value) in &result.params {
            md.push_str(&format!("- `{key}` = {value}\n"));
        }
        md.push('\n');
    }

    md.push_str("## Patterns\n\n");
    md.push_str(&format!(
        "- Double tops: {}\n- Double bottoms: {}\n- Buy signals: {}\n- Sell signals: {}\n\n",
        result.pattern_count(PatternKind::DoubleTop),
        result.pattern_count(PatternKind::DoubleBottom),
        result.signals.buy_count(),
        result.signals.sell_count(),
    ));

    let m = &result.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Total Profit | {:.2}% |\n", m.total_profit_pct));
    md.push_str(&format!("| Total Profit (USD) | {:.2} |\n", m.total_profit_usd));
    md.push_str(&format!("| Final Equity | {:.2} |\n", result.final_equity()));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate_pct));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe_ratio));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", m.max_drawdown_pct));
    md.push_str(&format!(
        "| Profit Factor | {} |\n",
        format_profit_factor(m.profit_factor)
    ));
    md.push_str(&format!(
        "| Trades | {} ({} won, {} lost) |\n",
        m.trade_count, m.winning_trades, m.losing_trades
    ));
    md.push_str(&format!(
        "| Avg Return / Trade | {:.2}% |\n",
        m.avg_return_per_trade_pct
    ));
    md.push('\n');

    if !result.trades.is_empty() {
        md.push_str("## Trades\n\n");
        md.push_str("| # | Entry | Exit | Reason | Bars | Return |\n");
        md.push_str("| ---: | --- | --- | --- | ---: | ---: |\n");
        for (i, t) in result.trades.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} @ {:.4} | {} @ {:.4} | {} | {} | {:.2}% |\n",
                i + 1,
                t.entry_time.format("%Y-%m-%d %H:%M"),
                t.entry_price,
                t.exit_time.format("%Y-%m-%d %H:%M"),
                t.exit_price,
                t.exit_reason.as_str(),
                t.bars_held,
                t.profit_pct
            ));
        }
        md.push('\n');
    }

    if !result.warnings.is_empty() {
        md.push_str("## Warnings\n\n");
        for warn in &result.warnings {
            md.push_str(&format!("- {warn}\n"));
        }
        md.push('\n');
    }

    md
}
