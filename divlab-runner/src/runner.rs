//! Backtest runner — wires together series loading, the engine, and the ledger.
//!
//! Three entry points:
//! - `run_backtest()`: loads the series named by a `RunConfig`, then runs. Used by CLI.
//! - `run_backtest_from_series()`: takes a pre-loaded series. No I/O.
//! - `run_batch()`: many independent configs, optionally fanned out with rayon.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use divlab_core::{
    annotate_ledger, check_alternation, run_strategy, AnnotatedPeriod, LedgerError, LedgerRow,
    SimulationError, StrategyConfig, TradeRecord, TradeSummary,
};

use crate::config::{ConfigFileError, RunConfig, RunId};
use crate::data_loader::{load_series_csv, LoadError, LoadedSeries, SeriesSource};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigFileError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation failed for '{symbol}': {source}")]
    Simulation {
        symbol: String,
        #[source]
        source: SimulationError,
    },
    #[error("trade log invariant violated: {0}")]
    Ledger(#[from] LedgerError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub source: SeriesSource,
    pub skipped_rows: usize,
    pub config: StrategyConfig,
    pub summary: TradeSummary,
    pub trades: Vec<TradeRecord>,
    pub ledger: Vec<LedgerRow>,
    /// Annotated series, for plotting.
    pub series: Vec<AnnotatedPeriod>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Deterministic id for one run: symbol, strategy parameters, and the data it saw.
fn result_run_id(symbol: &str, config: &StrategyConfig, dataset_hash: &str) -> RunId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(&serde_json::to_vec(config).unwrap_or_default());
    hasher.update(dataset_hash.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Run a single backtest from a `RunConfig` (loads the series CSV).
pub fn run_backtest(config: &RunConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_series_csv(&config.series.path, &config.series.columns)?;
    run_backtest_from_series(config.symbol(), &loaded, &config.strategy)
}

/// Run a backtest on a pre-loaded series. No I/O.
pub fn run_backtest_from_series(
    symbol: &str,
    loaded: &LoadedSeries,
    config: &StrategyConfig,
) -> Result<BacktestResult, RunError> {
    if loaded.source.is_synthetic() {
        tracing::warn!(symbol, "running on synthetic data; results are tagged synthetic");
    }
    tracing::info!(
        symbol,
        periods = loaded.records.len(),
        window = config.window,
        "running backtest"
    );

    let (series, sim) =
        run_strategy(&loaded.records, config).map_err(|source| RunError::Simulation {
            symbol: symbol.to_string(),
            source,
        })?;
    check_alternation(&sim.trades)?;

    let ledger = annotate_ledger(&sim.trades);
    let summary = sim.summary();

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        symbol: symbol.to_string(),
        run_id: result_run_id(symbol, config, &loaded.dataset_hash),
        dataset_hash: loaded.dataset_hash.clone(),
        synthetic: loaded.source.is_synthetic(),
        source: loaded.source.clone(),
        skipped_rows: loaded.skipped_rows,
        config: config.clone(),
        summary,
        trades: sim.trades,
        ledger,
        series,
    })
}

/// Run many configs. Each run is independent: one failure does not stop the others.
///
/// Results come back in input order whether or not `parallel` is set.
pub fn run_batch(configs: &[RunConfig], parallel: bool) -> Vec<Result<BacktestResult, RunError>> {
    tracing::info!(runs = configs.len(), parallel, "starting batch");
    if parallel {
        configs.par_iter().map(run_backtest).collect()
    } else {
        configs.iter().map(run_backtest).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::generate_synthetic_series;
    use chrono::NaiveDate;
    use divlab_core::{InputError, PeriodRecord};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, 3).unwrap()
    }

    #[test]
    fn synthetic_run_is_tagged_and_consistent() {
        let loaded = generate_synthetic_series("SYN", 300, start());
        let result =
            run_backtest_from_series("SYN", &loaded, &StrategyConfig::default()).unwrap();

        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert!(result.synthetic);
        assert_eq!(result.series.len(), 300);
        assert_eq!(result.ledger.len(), result.trades.len());
        assert_eq!(result.dataset_hash, loaded.dataset_hash);
        assert_eq!(
            result.summary.opened_positions + result.summary.closed_trades,
            result.trades.len()
        );
    }

    #[test]
    fn run_id_is_deterministic_and_config_sensitive() {
        let loaded = generate_synthetic_series("SYN", 100, start());
        let cfg = StrategyConfig::default();
        let a = run_backtest_from_series("SYN", &loaded, &cfg).unwrap();
        let b = run_backtest_from_series("SYN", &loaded, &cfg).unwrap();
        assert_eq!(a.run_id, b.run_id);

        let wider = StrategyConfig {
            window: 20,
            ..cfg.clone()
        };
        let c = run_backtest_from_series("SYN", &loaded, &wider).unwrap();
        assert_ne!(a.run_id, c.run_id);
    }

    #[test]
    fn empty_series_is_simulation_error() {
        let loaded = LoadedSeries::from_records(vec![], SeriesSource::Synthetic);
        let err = run_backtest_from_series("NONE", &loaded, &StrategyConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RunError::Simulation {
                source: SimulationError::Input(InputError::Empty),
                ..
            }
        ));
        assert!(err.to_string().contains("NONE"));
    }

    #[test]
    fn out_of_order_series_is_rejected() {
        let t = |d: u32| {
            NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        let records = vec![
            PeriodRecord::new(t(3), 100.0, 50.0),
            PeriodRecord::new(t(2), 101.0, 50.0),
        ];
        let loaded = LoadedSeries::from_records(
            records,
            SeriesSource::Csv {
                path: "x.csv".into(),
            },
        );
        let err = run_backtest_from_series("X", &loaded, &StrategyConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            RunError::Simulation {
                source: SimulationError::Input(InputError::NonMonotonicTimestamp { .. }),
                ..
            }
        ));
    }

    #[test]
    fn batch_reports_each_run_independently() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.csv");
        std::fs::write(
            &good,
            "timestamp,close,oscillator\n2024-01-02,100,40\n2024-01-03,99,30\n",
        )
        .unwrap();

        let configs = vec![
            RunConfig::new("GOOD", &good),
            RunConfig::new("MISSING", dir.path().join("missing.csv")),
            RunConfig::new("GOOD2", &good),
        ];

        for parallel in [false, true] {
            let results = run_batch(&configs, parallel);
            assert_eq!(results.len(), 3);
            assert_eq!(results[0].as_ref().unwrap().symbol, "GOOD");
            assert!(matches!(results[1], Err(RunError::Data(LoadError::Open { .. }))));
            assert_eq!(results[2].as_ref().unwrap().symbol, "GOOD2");
        }
    }

    #[test]
    fn invalid_config_fails_before_loading() {
        let mut cfg = RunConfig::new("SPY", "does-not-matter.csv");
        cfg.strategy.window = 0;
        assert!(matches!(
            run_backtest(&cfg),
            Err(RunError::Config(ConfigFileError::Strategy(_)))
        ));
    }
}
