//! Run summary derived from a `SimulationResult`.
//!
//! Trade counts are reported as closed round trips and opened positions
//! separately, so a log ending with an unmatched Buy is visible instead of
//! being folded into a halved record count.

use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, TradeRecord};

use super::state::SimulationResult;

/// Balance and trade statistics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_profit: f64,
    /// Sum of profits over closed trades only.
    pub realized_profit: f64,
    /// Mark-to-market profit of a position still open at the last period.
    pub unrealized_profit: f64,
    /// Number of Sell records.
    pub closed_trades: usize,
    /// Number of Buy records.
    pub opened_positions: usize,
    pub open_position: bool,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Winners over closed trades; 0.0 when nothing closed.
    pub win_rate: f64,
    pub stop_loss_exits: usize,
    pub signal_exits: usize,
}

impl TradeSummary {
    pub fn from_result(result: &SimulationResult) -> Self {
        let sells: Vec<&TradeRecord> = result.trades.iter().filter(|t| t.is_sell()).collect();
        let closed_trades = sells.len();
        let winning_trades = sells.iter().filter(|t| t.is_winner()).count();
        let losing_trades = sells
            .iter()
            .filter(|t| t.realized_profit.is_some_and(|p| p < 0.0))
            .count();
        let count_reason = |reason: ExitReason| {
            sells
                .iter()
                .filter(|t| t.exit_reason == Some(reason))
                .count()
        };

        Self {
            initial_balance: result.initial_balance,
            final_balance: result.final_balance,
            total_profit: result.total_profit,
            realized_profit: sells.iter().map(|t| t.profit_contribution()).sum(),
            unrealized_profit: result.final_position.unrealized_pnl(result.last_close),
            closed_trades,
            opened_positions: result.trades.iter().filter(|t| t.is_buy()).count(),
            open_position: result.final_position.is_open(),
            winning_trades,
            losing_trades,
            win_rate: if closed_trades == 0 {
                0.0
            } else {
                winning_trades as f64 / closed_trades as f64
            },
            stop_loss_exits: count_reason(ExitReason::StopLoss),
            signal_exits: count_reason(ExitReason::Signal),
        }
    }

    /// Total return as a fraction of the initial balance.
    pub fn total_return(&self) -> f64 {
        if self.initial_balance <= 0.0 {
            return 0.0;
        }
        self.total_profit / self.initial_balance
    }
}

impl SimulationResult {
    pub fn summary(&self) -> TradeSummary {
        TradeSummary::from_result(self)
    }
}
