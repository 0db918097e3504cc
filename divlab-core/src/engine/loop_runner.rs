//! Period-by-period simulation loop.
//!
//! One deterministic pass, no look-ahead: period `i` sees only its own close,
//! oscillator and divergence flags. Period 0 is never acted on.

use thiserror::Error;

use crate::config::{ConfigError, StrategyConfig};
use crate::divergence::DivergenceDetector;
use crate::domain::{AnnotatedPeriod, PeriodRecord};
use crate::series::{validate_records, validate_series, InputError};

use super::state::{SimulationResult, SimulationState};

/// Errors surfaced before any trade is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid input: {0}")]
    Input(#[from] InputError),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
}

/// Run the trade simulator over an annotated series.
///
/// Fails with no partial output if the config is invalid or the series is
/// empty or malformed.
pub fn simulate(
    series: &[AnnotatedPeriod],
    config: &StrategyConfig,
) -> Result<SimulationResult, SimulationError> {
    config.validate()?;
    validate_records(series.iter().map(|p| &p.record))?;
    let last = series.last().ok_or(InputError::Empty)?;

    let mut state = SimulationState::new(config.initial_balance);
    for (index, period) in series.iter().enumerate().skip(1) {
        state.step(index, period, config);
    }

    let inert_periods = series.iter().filter(|p| p.is_inert()).count();
    if inert_periods > 0 {
        tracing::debug!(inert_periods, "periods without rolling extrema skipped for signals");
    }

    let last_close = last.close();
    let final_balance = state.position.market_value(last_close);
    let total_profit = final_balance - config.initial_balance;

    tracing::info!(
        periods = series.len(),
        trades = state.trades.len(),
        final_balance,
        total_profit,
        open_position = state.position.is_open(),
        "simulation complete"
    );

    Ok(SimulationResult {
        trades: state.trades,
        final_position: state.position,
        initial_balance: config.initial_balance,
        final_balance,
        total_profit,
        last_close,
        period_count: series.len(),
        inert_periods,
    })
}

/// Validate, annotate and simulate a raw series in one call.
///
/// Returns the annotated series alongside the result so reporting can overlay
/// trades on the same data the simulator saw.
pub fn run_strategy(
    series: &[PeriodRecord],
    config: &StrategyConfig,
) -> Result<(Vec<AnnotatedPeriod>, SimulationResult), SimulationError> {
    config.validate()?;
    validate_series(series)?;
    let annotated = DivergenceDetector::new(config.window)?.annotate(series);
    let result = simulate(&annotated, config)?;
    Ok((annotated, result))
}
