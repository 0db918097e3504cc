//! Strategy parameters for the divergence detector and trade simulator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_WINDOW: usize = 10;
pub const DEFAULT_OVERSOLD: f64 = 35.0;
pub const DEFAULT_OVERBOUGHT: f64 = 65.0;
pub const DEFAULT_STOP_LOSS_FRACTION: f64 = 0.05;
pub const DEFAULT_INITIAL_BALANCE: f64 = 100_000.0;

/// Invalid strategy configuration. Every variant names the offending parameter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window must be >= 1, got {0}")]
    NonPositiveWindow(usize),

    #[error("{parameter} must be finite, got {value}")]
    NonFinite { parameter: &'static str, value: f64 },

    #[error("oversold_threshold ({oversold}) must be below overbought_threshold ({overbought})")]
    ThresholdOrder { oversold: f64, overbought: f64 },

    #[error("{parameter} out of range: {value} (expected {expected})")]
    OutOfRange {
        parameter: &'static str,
        value: f64,
        expected: &'static str,
    },
}

/// Parameters of one strategy run.
///
/// Every field has a default, so a partial TOML/JSON table deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Trailing window for rolling extrema (periods, inclusive of the current one).
    pub window: usize,
    /// Entry requires the oscillator strictly below this.
    pub oversold_threshold: f64,
    /// Signal exit requires the oscillator strictly above this.
    pub overbought_threshold: f64,
    /// Stop-loss distance below entry, as a fraction of the entry price.
    pub stop_loss_fraction: f64,
    pub initial_balance: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            oversold_threshold: DEFAULT_OVERSOLD,
            overbought_threshold: DEFAULT_OVERBOUGHT,
            stop_loss_fraction: DEFAULT_STOP_LOSS_FRACTION,
            initial_balance: DEFAULT_INITIAL_BALANCE,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::NonPositiveWindow(self.window));
        }
        for (parameter, value) in [
            ("oversold_threshold", self.oversold_threshold),
            ("overbought_threshold", self.overbought_threshold),
            ("stop_loss_fraction", self.stop_loss_fraction),
            ("initial_balance", self.initial_balance),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { parameter, value });
            }
        }
        if self.oversold_threshold >= self.overbought_threshold {
            return Err(ConfigError::ThresholdOrder {
                oversold: self.oversold_threshold,
                overbought: self.overbought_threshold,
            });
        }
        if !(self.stop_loss_fraction > 0.0 && self.stop_loss_fraction < 1.0) {
            return Err(ConfigError::OutOfRange {
                parameter: "stop_loss_fraction",
                value: self.stop_loss_fraction,
                expected: "0 < x < 1",
            });
        }
        if self.initial_balance <= 0.0 {
            return Err(ConfigError::OutOfRange {
                parameter: "initial_balance",
                value: self.initial_balance,
                expected: "x > 0",
            });
        }
        Ok(())
    }

    /// Price below which an open position is stopped out.
    pub fn stop_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.stop_loss_fraction)
    }
}
