//! Trade ledger — pure post-processing over an immutable trade log.
//!
//! Running profit and per-record durations are derived here after the
//! simulation pass, never accumulated inside it.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Action, ExitReason, TradeRecord};

/// One trade record with derived ledger columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub timestamp: NaiveDateTime,
    pub action: Action,
    pub price: f64,
    pub quantity: f64,
    pub balance: f64,
    pub profit: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    /// Running sum of realized profit up to and including this record.
    pub cumulative_profit: f64,
    /// Seconds until the next record; 0 for the last one.
    pub trade_duration_secs: i64,
}

impl LedgerRow {
    pub fn trade_duration(&self) -> Duration {
        Duration::seconds(self.trade_duration_secs)
    }
}

/// Derive `cumulative_profit` and `trade_duration` for every record.
pub fn annotate_ledger(trades: &[TradeRecord]) -> Vec<LedgerRow> {
    let mut cumulative = 0.0;
    trades
        .iter()
        .enumerate()
        .map(|(i, t)| {
            cumulative += t.profit_contribution();
            let duration = trades
                .get(i + 1)
                .map(|next| next.timestamp - t.timestamp)
                .unwrap_or_else(Duration::zero);
            LedgerRow {
                timestamp: t.timestamp,
                action: t.action,
                price: t.price,
                quantity: t.quantity,
                balance: t.balance_after,
                profit: t.realized_profit,
                exit_reason: t.exit_reason,
                cumulative_profit: cumulative,
                trade_duration_secs: duration.num_seconds(),
            }
        })
        .collect()
}

/// Trades split by action, for overlay rendering.
#[derive(Debug, Clone, Default)]
pub struct ActionPartition<'a> {
    pub buys: Vec<&'a TradeRecord>,
    pub sells: Vec<&'a TradeRecord>,
}

pub fn partition_by_action(trades: &[TradeRecord]) -> ActionPartition<'_> {
    let (buys, sells): (Vec<_>, Vec<_>) = trades.iter().partition(|t| t.is_buy());
    ActionPartition { buys, sells }
}

/// Violations of the Buy/Sell alternation invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("record {index}: expected {expected}, found {found}")]
    OutOfOrder {
        index: usize,
        expected: Action,
        found: Action,
    },

    #[error("record {index}: sell quantity {sell_quantity} does not match buy quantity {buy_quantity}")]
    QuantityMismatch {
        index: usize,
        buy_quantity: f64,
        sell_quantity: f64,
    },
}

/// Verify the log alternates Buy, Sell, Buy, ... and each Sell closes the
/// full quantity of the preceding Buy.
pub fn check_alternation(trades: &[TradeRecord]) -> Result<(), LedgerError> {
    let mut open_quantity: Option<f64> = None;
    for (index, t) in trades.iter().enumerate() {
        match (open_quantity, t.action) {
            (None, Action::Buy) => open_quantity = Some(t.quantity),
            (Some(buy_quantity), Action::Sell) => {
                if buy_quantity != t.quantity {
                    return Err(LedgerError::QuantityMismatch {
                        index,
                        buy_quantity,
                        sell_quantity: t.quantity,
                    });
                }
                open_quantity = None;
            }
            (None, found) => {
                return Err(LedgerError::OutOfOrder {
                    index,
                    expected: Action::Buy,
                    found,
                })
            }
            (Some(_), found) => {
                return Err(LedgerError::OutOfOrder {
                    index,
                    expected: Action::Sell,
                    found,
                })
            }
        }
    }
    Ok(())
}
