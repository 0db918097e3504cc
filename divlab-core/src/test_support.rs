//! Synthetic series builders shared by unit tests.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::PeriodRecord;

/// Daily timestamp `i` days after 2024-01-02.
pub fn day(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(i as i64)
}

/// Series from closes with a flat oscillator of 50.
pub fn make_series(closes: &[f64]) -> Vec<PeriodRecord> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PeriodRecord::new(day(i), close, 50.0))
        .collect()
}

/// Series from `(close, oscillator)` pairs.
pub fn make_series_with_osc(points: &[(f64, f64)]) -> Vec<PeriodRecord> {
    points
        .iter()
        .enumerate()
        .map(|(i, &(close, oscillator))| PeriodRecord::new(day(i), close, oscillator))
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}
