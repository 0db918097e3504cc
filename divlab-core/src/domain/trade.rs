//! TradeRecord — one emitted Buy or Sell event.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Side of a trade event. Long-only: Buy opens, Sell closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "Buy",
            Action::Sell => "Sell",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which exit rule closed a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Overbought oscillator with bearish divergence.
    Signal,
    /// Close fell below the stop level.
    StopLoss,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Signal => "signal",
            ExitReason::StopLoss => "stop_loss",
        }
    }
}

/// A single trade event, appended to the log and never mutated afterwards.
///
/// `balance_after` is the cash balance once the event settles: zero after a
/// Buy (fully invested), the liquidation value after a Sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Index of the period that produced this event.
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub action: Action,
    pub price: f64,
    pub quantity: f64,
    pub balance_after: f64,
    /// `(exit_price - entry_price) * quantity`; `Some` on Sell only.
    pub realized_profit: Option<f64>,
    /// `Some` on Sell only.
    pub exit_reason: Option<ExitReason>,
}

impl TradeRecord {
    pub fn buy(bar_index: usize, timestamp: NaiveDateTime, price: f64, quantity: f64) -> Self {
        Self {
            bar_index,
            timestamp,
            action: Action::Buy,
            price,
            quantity,
            balance_after: 0.0,
            realized_profit: None,
            exit_reason: None,
        }
    }

    pub fn sell(
        bar_index: usize,
        timestamp: NaiveDateTime,
        price: f64,
        quantity: f64,
        entry_price: f64,
        reason: ExitReason,
    ) -> Self {
        Self {
            bar_index,
            timestamp,
            action: Action::Sell,
            price,
            quantity,
            balance_after: quantity * price,
            realized_profit: Some((price - entry_price) * quantity),
            exit_reason: Some(reason),
        }
    }

    pub fn is_buy(&self) -> bool {
        self.action == Action::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.action == Action::Sell
    }

    /// Profit contribution to a running total; Buy events contribute zero.
    pub fn profit_contribution(&self) -> f64 {
        self.realized_profit.unwrap_or(0.0)
    }

    pub fn is_winner(&self) -> bool {
        self.realized_profit.is_some_and(|p| p > 0.0)
    }
}
