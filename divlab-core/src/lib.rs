//! DivLab Core — period series, divergence detection, trade simulation, trade ledger.
//!
//! This crate contains the decision logic of the backtester:
//! - Domain types (period records, positions, trade records)
//! - Series validation (the input contract)
//! - Divergence detector over a trailing window of price and oscillator extrema
//! - Two-state long-only trade simulator with a percentage stop-loss
//! - Pure ledger post-processing (cumulative profit, trade durations)
//!
//! Everything here is synchronous and free of I/O. Fetching the series,
//! computing the oscillator, and writing artifacts live outside this crate.

pub mod config;
pub mod divergence;
pub mod domain;
pub mod engine;
pub mod ledger;
pub mod series;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigError, StrategyConfig};
pub use divergence::{detect_divergences, DivergenceDetector, RollingExtremum};
pub use domain::{
    Action, AnnotatedPeriod, ExitReason, Extrema, PeriodRecord, Position, TradeRecord,
};
pub use engine::{run_strategy, simulate, SimulationError, SimulationResult, TradeSummary};
pub use ledger::{
    annotate_ledger, check_alternation, partition_by_action, ActionPartition, LedgerError, LedgerRow,
};
pub use series::{validate_series, InputError};
