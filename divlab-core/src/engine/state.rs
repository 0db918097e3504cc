//! Simulator state and run result types.

use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::domain::{AnnotatedPeriod, ExitReason, Position, TradeRecord};

/// Mutable state that evolves period by period during one simulation pass.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub position: Position,
    pub trades: Vec<TradeRecord>,
}

impl SimulationState {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            position: Position::flat(initial_balance),
            trades: Vec::new(),
        }
    }

    /// Apply the transition rules for period `index`. At most one fires.
    ///
    /// FLAT -> LONG on oversold oscillator with bullish divergence.
    /// LONG -> FLAT on overbought oscillator with bearish divergence, or on a
    /// close under the stop level regardless of the oscillator.
    ///
    /// Divergence flags on a period without extrema are ignored; only the
    /// stop can act there.
    pub fn step(&mut self, index: usize, period: &AnnotatedPeriod, config: &StrategyConfig) {
        let close = period.close();
        let oscillator = period.oscillator();
        let has_extrema = !period.is_inert();

        match self.position {
            Position::Flat { cash } => {
                if has_extrema
                    && oscillator < config.oversold_threshold
                    && period.bullish_divergence
                {
                    let quantity = cash / close;
                    self.position = Position::Long {
                        entry_price: close,
                        quantity,
                    };
                    let trade = TradeRecord::buy(index, period.timestamp(), close, quantity);
                    tracing::debug!(
                        index,
                        timestamp = %trade.timestamp,
                        price = close,
                        quantity,
                        "buy"
                    );
                    self.trades.push(trade);
                }
            }
            Position::Long {
                entry_price,
                quantity,
            } => {
                let signal_exit = has_extrema
                    && oscillator > config.overbought_threshold
                    && period.bearish_divergence;
                let stopped = close < config.stop_price(entry_price);
                if signal_exit || stopped {
                    let reason = if signal_exit {
                        ExitReason::Signal
                    } else {
                        ExitReason::StopLoss
                    };
                    let trade = TradeRecord::sell(
                        index,
                        period.timestamp(),
                        close,
                        quantity,
                        entry_price,
                        reason,
                    );
                    tracing::debug!(
                        index,
                        timestamp = %trade.timestamp,
                        price = close,
                        quantity,
                        profit = trade.profit_contribution(),
                        reason = reason.as_str(),
                        "sell"
                    );
                    self.position = Position::flat(trade.balance_after);
                    self.trades.push(trade);
                }
            }
        }
    }
}

/// Result of a complete simulation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Emitted Buy/Sell events in period order.
    pub trades: Vec<TradeRecord>,
    /// Position at the last period.
    pub final_position: Position,
    pub initial_balance: f64,
    /// Cash if flat, otherwise quantity marked at the last close.
    pub final_balance: f64,
    /// `final_balance - initial_balance`.
    pub total_profit: f64,
    pub last_close: f64,
    pub period_count: usize,
    /// Periods whose rolling extrema were undefined (signal-inert warm-up).
    pub inert_periods: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, Extrema};
    use crate::test_support::{day, make_series_with_osc};

    fn period(close: f64, osc: f64, bullish: bool, bearish: bool) -> AnnotatedPeriod {
        let rec = make_series_with_osc(&[(close, osc)])[0];
        AnnotatedPeriod {
            record: rec,
            extrema: Some(Extrema {
                price_low: close,
                price_high: close,
                osc_low: osc,
                osc_high: osc,
            }),
            bullish_divergence: bullish,
            bearish_divergence: bearish,
        }
    }

    #[test]
    fn initial_state_is_flat() {
        let state = SimulationState::new(100_000.0);
        assert_eq!(state.position, Position::flat(100_000.0));
        assert!(state.trades.is_empty());
    }

    #[test]
    fn entry_requires_oversold_and_bullish() {
        let cfg = StrategyConfig::default();
        let mut state = SimulationState::new(100_000.0);

        state.step(1, &period(100.0, 40.0, true, false), &cfg);
        assert!(state.trades.is_empty(), "oscillator not oversold");

        state.step(2, &period(100.0, 30.0, false, false), &cfg);
        assert!(state.trades.is_empty(), "no divergence");

        state.step(3, &period(100.0, 30.0, true, false), &cfg);
        assert_eq!(state.trades.len(), 1);
        assert_eq!(state.trades[0].action, Action::Buy);
        assert_eq!(state.trades[0].quantity, 1_000.0);
        assert_eq!(state.position.cash(), 0.0);
    }

    #[test]
    fn oversold_threshold_is_strict() {
        let cfg = StrategyConfig::default();
        let mut state = SimulationState::new(100_000.0);
        state.step(1, &period(100.0, 35.0, true, false), &cfg);
        assert!(state.trades.is_empty());
    }

    #[test]
    fn overbought_threshold_is_strict() {
        let cfg = StrategyConfig::default();
        let mut state = SimulationState::new(100_000.0);
        state.step(1, &period(100.0, 30.0, true, false), &cfg);
        state.step(2, &period(110.0, 65.0, false, true), &cfg);
        assert_eq!(state.trades.len(), 1);
        assert!(state.position.is_open());
    }

    #[test]
    fn flags_without_extrema_never_trade() {
        let cfg = StrategyConfig::default();
        let mut state = SimulationState::new(100_000.0);

        let mut entry = period(100.0, 10.0, true, false);
        entry.extrema = None;
        state.step(1, &entry, &cfg);
        assert!(state.trades.is_empty());

        state.step(2, &period(100.0, 30.0, true, false), &cfg);
        let mut exit = period(110.0, 90.0, false, true);
        exit.extrema = None;
        state.step(3, &exit, &cfg);
        assert_eq!(state.trades.len(), 1, "bearish flag without extrema");

        // The stop still applies on an inert period.
        let mut crash = period(90.0, 50.0, false, false);
        crash.extrema = None;
        state.step(4, &crash, &cfg);
        assert_eq!(state.trades.len(), 2);
        assert_eq!(state.trades[1].exit_reason, Some(ExitReason::StopLoss));
    }

    #[test]
    fn no_pyramiding_while_long() {
        let cfg = StrategyConfig::default();
        let mut state = SimulationState::new(100_000.0);
        state.step(1, &period(100.0, 30.0, true, false), &cfg);
        state.step(2, &period(99.0, 20.0, true, false), &cfg);
        assert_eq!(state.trades.len(), 1);
    }

    #[test]
    fn signal_exit_requires_overbought_and_bearish() {
        let cfg = StrategyConfig::default();
        let mut state = SimulationState::new(100_000.0);
        state.step(1, &period(100.0, 30.0, true, false), &cfg);

        state.step(2, &period(110.0, 60.0, false, true), &cfg);
        assert_eq!(state.trades.len(), 1, "oscillator not overbought");

        state.step(3, &period(110.0, 70.0, false, true), &cfg);
        assert_eq!(state.trades.len(), 2);
        let sell = &state.trades[1];
        assert_eq!(sell.exit_reason, Some(ExitReason::Signal));
        assert!((sell.realized_profit.unwrap() - 10_000.0).abs() < 1e-6);
        assert!((state.position.cash() - 110_000.0).abs() < 1e-6);
    }

    #[test]
    fn stop_loss_ignores_oscillator() {
        let cfg = StrategyConfig::default();
        let mut state = SimulationState::new(100_000.0);
        state.step(1, &period(100.0, 30.0, true, false), &cfg);
        state.step(2, &period(94.0, 10.0, true, false), &cfg);
        assert_eq!(state.trades.len(), 2);
        assert_eq!(state.trades[1].exit_reason, Some(ExitReason::StopLoss));
        assert!(!state.position.is_open());
    }

    #[test]
    fn stop_level_itself_does_not_trigger() {
        let cfg = StrategyConfig::default();
        let mut state = SimulationState::new(100_000.0);
        state.step(1, &period(100.0, 30.0, true, false), &cfg);
        state.step(2, &period(cfg.stop_price(100.0), 50.0, false, false), &cfg);
        assert_eq!(state.trades.len(), 1);
    }

    #[test]
    fn signal_exit_takes_precedence_in_reason() {
        let cfg = StrategyConfig::default();
        let mut state = SimulationState::new(100_000.0);
        state.step(1, &period(100.0, 30.0, true, false), &cfg);
        state.step(2, &period(90.0, 80.0, false, true), &cfg);
        assert_eq!(state.trades[1].exit_reason, Some(ExitReason::Signal));
        assert_eq!(state.trades[1].timestamp, day(0));
    }
}
