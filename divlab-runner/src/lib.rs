//! DivLab Runner — run orchestration on top of `divlab-core`.
//!
//! This crate provides:
//! - TOML run configuration with content-addressed run ids
//! - Series loading from CSV, plus a deterministic synthetic generator
//! - Single and batch backtest runners
//! - Artifact export (trade ledger CSV, annotated series CSV, JSON result)

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{BacktestSection, ConfigFileError, RunConfig, RunId, SeriesSection};
pub use data_loader::{
    compute_dataset_hash, generate_synthetic_series, load_series_csv, parse_timestamp, LoadError,
    LoadedSeries, SeriesColumns, SeriesSource,
};
pub use export::{
    export_json, export_records_csv, export_series_csv, export_trades_csv, format_summary,
    import_json, load_summary, save_artifacts,
};
pub use runner::{
    run_backtest, run_backtest_from_series, run_batch, BacktestResult, RunError, SCHEMA_VERSION,
};
