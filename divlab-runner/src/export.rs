//! Reporting and export — JSON and CSV artifacts plus the console summary.
//!
//! - **JSON**: full round-trip serialization of `BacktestResult` with schema versioning
//! - **CSV**: trade ledger, annotated series (for plotting), raw period series
//! - **Text**: the balance summary printed after a run
//!
//! Unknown (newer) schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use divlab_core::{AnnotatedPeriod, LedgerRow, PeriodRecord, TradeSummary};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
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

/// Export the trade ledger as CSV.
///
/// Columns: timestamp, action, price, quantity, balance, profit,
/// cumulative_profit, trade_duration_secs, exit_reason.
/// `profit` and `exit_reason` are blank on Buy rows.
pub fn export_trades_csv(ledger: &[LedgerRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "timestamp",
        "action",
        "price",
        "quantity",
        "balance",
        "profit",
        "cumulative_profit",
        "trade_duration_secs",
        "exit_reason",
    ])?;

    for row in ledger {
        wtr.write_record([
            fmt_ts(&row.timestamp).as_str(),
            row.action.as_str(),
            &format!("{:.6}", row.price),
            &format!("{:.6}", row.quantity),
            &format!("{:.2}", row.balance),
            &row.profit.map(|p| format!("{p:.2}")).unwrap_or_default(),
            &format!("{:.2}", row.cumulative_profit),
            &row.trade_duration_secs.to_string(),
            row.exit_reason.map(|r| r.as_str()).unwrap_or(""),
        ])?;
    }

    finish_csv(wtr)
}

/// Export the annotated series as CSV for chart rendering.
///
/// Extremum cells are blank during the warm-up prefix.
pub fn export_series_csv(series: &[AnnotatedPeriod]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "timestamp",
        "close",
        "oscillator",
        "price_low",
        "price_high",
        "osc_low",
        "osc_high",
        "bullish_divergence",
        "bearish_divergence",
    ])?;

    let opt = |v: Option<f64>| v.map(|x| format!("{x:.6}")).unwrap_or_default();
    for p in series {
        let ext = p.extrema;
        wtr.write_record([
            fmt_ts(&p.timestamp()).as_str(),
            &format!("{:.6}", p.close()),
            &format!("{:.6}", p.oscillator()),
            &opt(ext.map(|e| e.price_low)),
            &opt(ext.map(|e| e.price_high)),
            &opt(ext.map(|e| e.osc_low)),
            &opt(ext.map(|e| e.osc_high)),
            &p.bullish_divergence.to_string(),
            &p.bearish_divergence.to_string(),
        ])?;
    }

    finish_csv(wtr)
}

/// Export plain period records in the layout `load_series_csv` reads by default.
pub fn export_records_csv(records: &[PeriodRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "close", "oscillator"])?;
    for r in records {
        wtr.write_record([
            fmt_ts(&r.timestamp).as_str(),
            &format!("{:.6}", r.close),
            &format!("{:.4}", r.oscillator),
        ])?;
    }
    finish_csv(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a single run under `output_dir`:
/// - `{symbol}_trades.csv` — trade ledger
/// - `{symbol}_series.csv` — annotated series
/// - `{symbol}_summary.json` — the full `BacktestResult`
///
/// Returns the written paths in that order.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let files = [
        (
            format!("{}_trades.csv", result.symbol),
            export_trades_csv(&result.ledger)?,
        ),
        (
            format!("{}_series.csv", result.symbol),
            export_series_csv(&result.series)?,
        ),
        (
            format!("{}_summary.json", result.symbol),
            export_json(result)?,
        ),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = output_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    tracing::debug!(symbol = %result.symbol, files = written.len(), "artifacts saved");
    Ok(written)
}

/// Load a `BacktestResult` from a `{symbol}_summary.json` file.
pub fn load_summary(path: &Path) -> Result<BacktestResult> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Text summary ───────────────────────────────────────────────────

/// Human-readable balance summary for one run.
pub fn format_summary(summary: &TradeSummary) -> String {
    let mut out = String::with_capacity(512);
    out.push_str(&format!("Initial Balance: {:.2}\n", summary.initial_balance));
    out.push_str(&format!("Final Balance:   {:.2}\n", summary.final_balance));
    out.push_str(&format!(
        "Total Profit:    {:.2} ({:+.2}%)\n",
        summary.total_profit,
        summary.total_return() * 100.0
    ));
    out.push_str(&format!(
        "Closed Trades:   {} ({} won, {} lost, win rate {:.1}%)\n",
        summary.closed_trades,
        summary.winning_trades,
        summary.losing_trades,
        summary.win_rate * 100.0
    ));
    if summary.closed_trades > 0 {
        out.push_str(&format!(
            "Exits:           {} signal, {} stop-loss\n",
            summary.signal_exits, summary.stop_loss_exits
        ));
    }
    if summary.open_position {
        out.push_str(&format!(
            "Open Position:   yes, marked to last close (unrealized {:.2})\n",
            summary.unrealized_profit
        ));
    }
    out
}
