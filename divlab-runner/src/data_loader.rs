//! Series loading for the runner.
//!
//! Two sources produce a `LoadedSeries`:
//! 1. A CSV file with timestamp, close, and oscillator columns
//! 2. A deterministic synthetic series (developer-only, tagged `synthetic`)
//!
//! Market-data fetching and oscillator computation happen upstream; this
//! layer only reads what they wrote.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use divlab_core::PeriodRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the series loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open series file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("line {line}: cannot parse {column} value '{value}'")]
    Parse {
        line: u64,
        column: String,
        value: String,
    },

    #[error("line {line}: blank {column} cell after the series has started")]
    BlankCell { line: u64, column: String },
}

/// Column names and gap policy for a series CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesColumns {
    pub timestamp_column: String,
    pub close_column: String,
    pub oscillator_column: String,
    /// Drop leading rows whose oscillator cell is blank (indicator warm-up).
    pub skip_leading_gaps: bool,
}

impl Default for SeriesColumns {
    fn default() -> Self {
        Self {
            timestamp_column: "timestamp".into(),
            close_column: "close".into(),
            oscillator_column: "oscillator".into(),
            skip_leading_gaps: true,
        }
    }
}

/// Where a loaded series came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeriesSource {
    Csv { path: PathBuf },
    Synthetic,
}

impl SeriesSource {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, SeriesSource::Synthetic)
    }
}

/// A series ready for the engine, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub records: Vec<PeriodRecord>,
    pub source: SeriesSource,
    /// BLAKE3 over timestamps, closes and oscillator values.
    pub dataset_hash: String,
    /// Leading warm-up rows dropped because their oscillator was blank.
    pub skipped_rows: usize,
}

impl LoadedSeries {
    pub fn from_records(records: Vec<PeriodRecord>, source: SeriesSource) -> Self {
        let dataset_hash = compute_dataset_hash(&records);
        Self {
            records,
            source,
            dataset_hash,
            skipped_rows: 0,
        }
    }
}

/// Load a period series from a CSV file.
///
/// Rows are taken in file order; ordering and finiteness are checked later by
/// the engine's input validation, not here.
pub fn load_series_csv(path: &Path, columns: &SeriesColumns) -> Result<LoadedSeries, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn {
                column: name.to_string(),
                path: path.to_path_buf(),
            })
    };
    let ts_idx = find(&columns.timestamp_column)?;
    let close_idx = find(&columns.close_column)?;
    let osc_idx = find(&columns.oscillator_column)?;

    let mut records = Vec::new();
    let mut skipped_rows = 0;

    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let cell = |idx: usize| row.get(idx).unwrap_or("");

        let osc_cell = cell(osc_idx);
        if osc_cell.is_empty() {
            if columns.skip_leading_gaps && records.is_empty() {
                skipped_rows += 1;
                continue;
            }
            return Err(LoadError::BlankCell {
                line,
                column: columns.oscillator_column.clone(),
            });
        }

        let parse_error = |column: &str, value: &str| LoadError::Parse {
            line,
            column: column.to_string(),
            value: value.to_string(),
        };

        let ts_cell = cell(ts_idx);
        let timestamp =
            parse_timestamp(ts_cell).ok_or_else(|| parse_error(&columns.timestamp_column, ts_cell))?;
        let close_cell = cell(close_idx);
        let close: f64 = close_cell
            .parse()
            .map_err(|_| parse_error(&columns.close_column, close_cell))?;
        let oscillator: f64 = osc_cell
            .parse()
            .map_err(|_| parse_error(&columns.oscillator_column, osc_cell))?;

        records.push(PeriodRecord::new(timestamp, close, oscillator));
    }

    if skipped_rows > 0 {
        tracing::debug!(
            path = %path.display(),
            skipped_rows,
            "dropped leading rows with blank oscillator"
        );
    }

    let mut loaded = LoadedSeries::from_records(
        records,
        SeriesSource::Csv {
            path: path.to_path_buf(),
        },
    );
    loaded.skipped_rows = skipped_rows;
    Ok(loaded)
}

/// Parse the timestamp formats that common exporters write.
///
/// Offsets are dropped and the local wall-clock time is kept.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z")
        .ok()
        .map(|dt| dt.naive_local())
}

/// Compute a deterministic BLAKE3 hash over the series.
pub fn compute_dataset_hash(records: &[PeriodRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for r in records {
        hasher.update(r.timestamp.to_string().as_bytes());
        hasher.update(&r.close.to_le_bytes());
        hasher.update(&r.oscillator.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate a synthetic series for testing/development.
///
/// Closes follow a random walk from 100.0 on weekdays starting at `start`.
/// The oscillator mean-reverts toward 50 and reacts to each period's return,
/// staying within [1, 99]. Seeded from the symbol name, so output is
/// reproducible per symbol.
pub fn generate_synthetic_series(symbol: &str, periods: usize, start: NaiveDate) -> LoadedSeries {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut records = Vec::with_capacity(periods);
    let mut price = 100.0_f64;
    let mut oscillator = 50.0_f64;
    let mut current = start;

    while records.len() < periods {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        price *= 1.0 + daily_return;
        oscillator = (50.0
            + 0.85 * (oscillator - 50.0)
            + daily_return * 400.0
            + rng.gen_range(-4.0..4.0))
        .clamp(1.0, 99.0);

        if let Some(timestamp) = current.and_hms_opt(0, 0, 0) {
            records.push(PeriodRecord::new(timestamp, price, oscillator));
        }
        current += chrono::Duration::days(1);
    }

    LoadedSeries::from_records(records, SeriesSource::Synthetic)
}
