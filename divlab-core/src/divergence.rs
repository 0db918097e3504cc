//! Divergence detection — rolling price/oscillator extrema and reversal flags.
//!
//! For every period `i` with a full trailing window `[i-W+1, i]`:
//! - bullish: `close[i] <= min(close)` and `osc[i] > min(osc)`
//! - bearish: `close[i] >= max(close)` and `osc[i] < max(osc)`
//!
//! The price side is inclusive and the oscillator side strict: a bullish flag
//! means price printed (or tied) its window low while the oscillator stayed
//! strictly above its own low.
//!
//! Lookback: window - 1. Earlier periods carry no extrema and never signal.

use std::collections::VecDeque;

use crate::config::ConfigError;
use crate::domain::{AnnotatedPeriod, Extrema, PeriodRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Min,
    Max,
}

/// Sliding-window minimum or maximum over a stream of indexed values.
///
/// Monotonic deque: each value enters and leaves at most once, so a full pass
/// is O(n) regardless of window size.
#[derive(Debug, Clone)]
pub struct RollingExtremum {
    window: usize,
    side: Side,
    deque: VecDeque<(usize, f64)>,
    pushed: usize,
}

impl RollingExtremum {
    /// Trailing minimum over `window` values.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero. `DivergenceDetector::new` checks this and
    /// returns `ConfigError::NonPositiveWindow` instead.
    pub fn min(window: usize) -> Self {
        Self::new(window, Side::Min)
    }

    /// Trailing maximum over `window` values.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero.
    pub fn max(window: usize) -> Self {
        Self::new(window, Side::Max)
    }

    fn new(window: usize, side: Side) -> Self {
        assert!(window >= 1, "rolling window must be >= 1");
        Self {
            window,
            side,
            deque: VecDeque::with_capacity(window),
            pushed: 0,
        }
    }

    /// Push the value at `index` (indices must increase by one per call).
    ///
    /// Returns the extremum of the last `window` values, or `None` while
    /// fewer than `window` values have been seen.
    pub fn push(&mut self, index: usize, value: f64) -> Option<f64> {
        while let Some(&(_, back)) = self.deque.back() {
            let dominated = match self.side {
                Side::Min => back >= value,
                Side::Max => back <= value,
            };
            if !dominated {
                break;
            }
            self.deque.pop_back();
        }
        self.deque.push_back((index, value));

        while let Some(&(front_index, _)) = self.deque.front() {
            if front_index + self.window <= index {
                self.deque.pop_front();
            } else {
                break;
            }
        }

        self.pushed += 1;
        if self.pushed < self.window {
            return None;
        }
        self.deque.front().map(|&(_, v)| v)
    }
}

/// Annotates a series with rolling extrema and divergence flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivergenceDetector {
    window: usize,
}

impl DivergenceDetector {
    pub fn new(window: usize) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::NonPositiveWindow(window));
        }
        Ok(Self { window })
    }

    /// Number of leading periods that can never carry extrema.
    pub fn lookback(&self) -> usize {
        self.window - 1
    }

    pub fn annotate(&self, series: &[PeriodRecord]) -> Vec<AnnotatedPeriod> {
        let mut price_low = RollingExtremum::min(self.window);
        let mut price_high = RollingExtremum::max(self.window);
        let mut osc_low = RollingExtremum::min(self.window);
        let mut osc_high = RollingExtremum::max(self.window);

        series
            .iter()
            .enumerate()
            .map(|(i, rec)| {
                let extrema = match (
                    price_low.push(i, rec.close),
                    price_high.push(i, rec.close),
                    osc_low.push(i, rec.oscillator),
                    osc_high.push(i, rec.oscillator),
                ) {
                    (Some(price_low), Some(price_high), Some(osc_low), Some(osc_high)) => {
                        Extrema {
                            price_low,
                            price_high,
                            osc_low,
                            osc_high,
                        }
                    }
                    _ => return AnnotatedPeriod::inert(*rec),
                };

                AnnotatedPeriod {
                    record: *rec,
                    extrema: Some(extrema),
                    bullish_divergence: rec.close <= extrema.price_low
                        && rec.oscillator > extrema.osc_low,
                    bearish_divergence: rec.close >= extrema.price_high
                        && rec.oscillator < extrema.osc_high,
                }
            })
            .collect()
    }
}

/// Annotate `series` with a trailing window of `window` periods.
pub fn detect_divergences(
    series: &[PeriodRecord],
    window: usize,
) -> Result<Vec<AnnotatedPeriod>, ConfigError> {
    Ok(DivergenceDetector::new(window)?.annotate(series))
}
