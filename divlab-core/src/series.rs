//! Input series validation.
//!
//! Runs before any simulation state exists. A series either passes whole or
//! is rejected with the first offending index; nothing downstream ever sees a
//! partially valid series.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::PeriodRecord;

/// Malformed input series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("input series is empty")]
    Empty,

    #[error("timestamp at index {index} ({timestamp}) is not after the previous one ({previous})")]
    NonMonotonicTimestamp {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },

    #[error("close at index {index} ({timestamp}) must be positive and finite, got {value}")]
    InvalidClose {
        index: usize,
        timestamp: NaiveDateTime,
        value: f64,
    },

    #[error("oscillator at index {index} ({timestamp}) must be finite, got {value}")]
    InvalidOscillator {
        index: usize,
        timestamp: NaiveDateTime,
        value: f64,
    },
}

/// Check the series contract: non-empty, strictly increasing timestamps,
/// positive finite closes, finite oscillator values.
///
/// Oscillator readings outside [0, 100] are tolerated and only logged.
pub fn validate_series(series: &[PeriodRecord]) -> Result<(), InputError> {
    validate_records(series)
}

/// Same contract as [`validate_series`] over any ordered sequence of records.
pub fn validate_records<'a, I>(records: I) -> Result<(), InputError>
where
    I: IntoIterator<Item = &'a PeriodRecord>,
{
    let mut previous: Option<NaiveDateTime> = None;
    let mut count = 0usize;
    let mut out_of_band = 0usize;

    for (index, rec) in records.into_iter().enumerate() {
        count += 1;
        if let Some(previous) = previous {
            if rec.timestamp <= previous {
                return Err(InputError::NonMonotonicTimestamp {
                    index,
                    timestamp: rec.timestamp,
                    previous,
                });
            }
        }
        previous = Some(rec.timestamp);

        if !(rec.close.is_finite() && rec.close > 0.0) {
            return Err(InputError::InvalidClose {
                index,
                timestamp: rec.timestamp,
                value: rec.close,
            });
        }
        if !rec.oscillator.is_finite() {
            return Err(InputError::InvalidOscillator {
                index,
                timestamp: rec.timestamp,
                value: rec.oscillator,
            });
        }
        if !rec.oscillator_in_band() {
            out_of_band += 1;
        }
    }

    if count == 0 {
        return Err(InputError::Empty);
    }
    if out_of_band > 0 {
        tracing::warn!(
            out_of_band,
            periods = count,
            "oscillator values outside [0, 100]"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn series(closes: &[f64]) -> Vec<PeriodRecord> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PeriodRecord::new(ts(i as u32 + 1), c, 50.0))
            .collect()
    }

    #[test]
    fn accepts_well_formed_series() {
        assert!(validate_series(&series(&[100.0, 101.0, 99.5])).is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(validate_series(&[]), Err(InputError::Empty));
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let mut s = series(&[100.0, 101.0, 102.0]);
        s[2].timestamp = s[1].timestamp;
        match validate_series(&s) {
            Err(InputError::NonMonotonicTimestamp { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected NonMonotonicTimestamp, got {other:?}"),
        }
    }

    #[test]
    fn rejects_decreasing_timestamp() {
        let mut s = series(&[100.0, 101.0]);
        s.swap(0, 1);
        assert!(matches!(
            validate_series(&s),
            Err(InputError::NonMonotonicTimestamp { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_non_positive_close() {
        let s = series(&[100.0, 0.0]);
        let err = validate_series(&s).unwrap_err();
        assert!(matches!(err, InputError::InvalidClose { index: 1, .. }));
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn rejects_nan_oscillator() {
        let mut s = series(&[100.0, 101.0]);
        s[0].oscillator = f64::NAN;
        assert!(matches!(
            validate_series(&s),
            Err(InputError::InvalidOscillator { index: 0, .. })
        ));
    }

    #[test]
    fn tolerates_out_of_band_oscillator() {
        let mut s = series(&[100.0, 101.0]);
        s[1].oscillator = 120.0;
        assert!(validate_series(&s).is_ok());
    }
}
