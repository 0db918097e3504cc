//! TOML run configuration.
//!
//! A run file names one symbol, its strategy parameters, and the CSV that
//! carries its close/oscillator series:
//!
//! ```toml
//! [backtest]
//! symbol = "RELIANCE.NS"
//!
//! [strategy]
//! window = 10
//! stop_loss_fraction = 0.05
//!
//! [series]
//! path = "data/RELIANCE.NS.csv"
//! oscillator_column = "RSI"
//! ```
//!
//! `[strategy]` and every column key in `[series]` are optional.

use std::path::{Path, PathBuf};

use divlab_core::{ConfigError, StrategyConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_loader::SeriesColumns;

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

/// Errors from reading or validating a run file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid strategy parameters: {0}")]
    Strategy(#[from] ConfigError),

    #[error("backtest.symbol must not be empty")]
    EmptySymbol,

    #[error("backtest.symbol '{0}' must not contain path separators")]
    InvalidSymbol(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
}

/// Where the series lives and how its columns are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSection {
    pub path: PathBuf,
    #[serde(flatten)]
    pub columns: SeriesColumns,
}

/// A complete, reproducible run description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategyConfig,
    pub series: SeriesSection,
}

impl RunConfig {
    /// Build a config in code (CLI flags, batch construction).
    pub fn new(symbol: impl Into<String>, series_path: impl Into<PathBuf>) -> Self {
        Self {
            backtest: BacktestSection {
                symbol: symbol.into(),
            },
            strategy: StrategyConfig::default(),
            series: SeriesSection {
                path: series_path.into(),
                columns: SeriesColumns::default(),
            },
        }
    }

    /// Parse a run file from a TOML string. Does not validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(content)?)
    }

    /// Load and validate a run file.
    ///
    /// A relative `series.path` is resolved against the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if config.series.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.series.path = dir.join(&config.series.path);
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigFileError> {
        if self.backtest.symbol.trim().is_empty() {
            return Err(ConfigFileError::EmptySymbol);
        }
        // The symbol names the artifact files inside the output directory.
        if self.backtest.symbol.contains(['/', '\\']) {
            return Err(ConfigFileError::InvalidSymbol(self.backtest.symbol.clone()));
        }
        self.strategy.validate()?;
        Ok(())
    }

    pub fn symbol(&self) -> &str {
        &self.backtest.symbol
    }

    /// Deterministic BLAKE3 hash of the canonical JSON form of this config.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        // Plain strings, paths and floats: serialization has no failure path here.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[backtest]
symbol = "RELIANCE.NS"

[strategy]
window = 14
oversold_threshold = 30.0
overbought_threshold = 70.0
stop_loss_fraction = 0.08
initial_balance = 50000.0

[series]
path = "data/RELIANCE.NS.csv"
timestamp_column = "Date"
close_column = "Close"
oscillator_column = "RSI"
skip_leading_gaps = false
"#;

    const MINIMAL: &str = r#"
[backtest]
symbol = "SPY"

[series]
path = "spy.csv"
"#;

    #[test]
    fn parses_full_file() {
        let cfg = RunConfig::from_toml(FULL).unwrap();
        assert_eq!(cfg.symbol(), "RELIANCE.NS");
        assert_eq!(cfg.strategy.window, 14);
        assert_eq!(cfg.strategy.stop_loss_fraction, 0.08);
        assert_eq!(cfg.series.path, PathBuf::from("data/RELIANCE.NS.csv"));
        assert_eq!(cfg.series.columns.timestamp_column, "Date");
        assert_eq!(cfg.series.columns.oscillator_column, "RSI");
        assert!(!cfg.series.columns.skip_leading_gaps);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let cfg = RunConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(cfg.strategy, StrategyConfig::default());
        assert_eq!(cfg.series.columns, SeriesColumns::default());
    }

    #[test]
    fn partial_strategy_table_fills_defaults() {
        let toml = r#"
[backtest]
symbol = "SPY"

[strategy]
window = 5

[series]
path = "spy.csv"
"#;
        let cfg = RunConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.strategy.window, 5);
        assert_eq!(cfg.strategy.oversold_threshold, 35.0);
        assert_eq!(cfg.strategy.initial_balance, 100_000.0);
    }

    #[test]
    fn missing_series_table_is_parse_error() {
        let err = RunConfig::from_toml("[backtest]\nsymbol = \"SPY\"\n").unwrap_err();
        assert!(matches!(err, ConfigFileError::Parse(_)));
    }

    #[test]
    fn blank_symbol_rejected() {
        let mut cfg = RunConfig::from_toml(MINIMAL).unwrap();
        cfg.backtest.symbol = "  ".into();
        assert!(matches!(cfg.validate(), Err(ConfigFileError::EmptySymbol)));
    }

    #[test]
    fn symbol_with_path_separator_rejected() {
        let mut cfg = RunConfig::from_toml(MINIMAL).unwrap();
        for symbol in ["../escape", "a/b", "..\\up"] {
            cfg.backtest.symbol = symbol.into();
            assert!(matches!(
                cfg.validate(),
                Err(ConfigFileError::InvalidSymbol(ref s)) if s == symbol
            ));
        }
        cfg.backtest.symbol = "BRK.B".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_thresholds_surface_as_strategy_error() {
        let mut cfg = RunConfig::from_toml(MINIMAL).unwrap();
        cfg.strategy.oversold_threshold = 80.0;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::Strategy(ConfigError::ThresholdOrder { .. })
        ));
    }

    #[test]
    fn run_id_deterministic() {
        let cfg = RunConfig::from_toml(FULL).unwrap();
        let id1 = cfg.run_id();
        let id2 = cfg.run_id();
        assert_eq!(id1, id2, "RunId should be deterministic");
        assert_eq!(id1.len(), 64);
    }

    #[test]
    fn run_id_changes_with_params() {
        let cfg1 = RunConfig::from_toml(FULL).unwrap();
        let mut cfg2 = cfg1.clone();
        cfg2.strategy.window = 20;
        assert_ne!(cfg1.run_id(), cfg2.run_id());
    }

    #[test]
    fn from_file_resolves_relative_series_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let cfg = RunConfig::from_file(&path).unwrap();
        assert_eq!(cfg.series.path, dir.path().join("spy.csv"));
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigFileError::Io { .. }));
        assert!(err.to_string().contains("nope.toml"));
    }
}
