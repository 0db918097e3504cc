//! PeriodRecord — one observation of the input series, plus its annotated form.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One period of the input series: a closing price and a precomputed oscillator reading.
///
/// The oscillator is a bounded momentum indicator (nominally 0–100) supplied
/// by the caller; this crate never computes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub oscillator: f64,
}

impl PeriodRecord {
    pub fn new(timestamp: NaiveDateTime, close: f64, oscillator: f64) -> Self {
        Self {
            timestamp,
            close,
            oscillator,
        }
    }

    /// Returns true if the oscillator sits inside its nominal [0, 100] band.
    pub fn oscillator_in_band(&self) -> bool {
        (0.0..=100.0).contains(&self.oscillator)
    }
}

/// Rolling extrema over the trailing window ending at a period (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrema {
    pub price_low: f64,
    pub price_high: f64,
    pub osc_low: f64,
    pub osc_high: f64,
}

/// A period with its derived divergence fields.
///
/// `extrema` is `None` until the trailing window is full. Both flags are
/// always false while `extrema` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedPeriod {
    pub record: PeriodRecord,
    pub extrema: Option<Extrema>,
    pub bullish_divergence: bool,
    pub bearish_divergence: bool,
}

impl AnnotatedPeriod {
    /// A warm-up period: no extrema, no signals.
    pub fn inert(record: PeriodRecord) -> Self {
        Self {
            record,
            extrema: None,
            bullish_divergence: false,
            bearish_divergence: false,
        }
    }

    pub fn is_inert(&self) -> bool {
        self.extrema.is_none()
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.record.timestamp
    }

    pub fn close(&self) -> f64 {
        self.record.close
    }

    pub fn oscillator(&self) -> f64 {
        self.record.oscillator
    }
}
