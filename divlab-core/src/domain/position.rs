use serde::{Deserialize, Serialize};

/// Simulator position state: either all cash or fully invested in one long position.
///
/// Exactly one of the two holds at every period boundary, so pyramiding and
/// shorting are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Position {
    Flat { cash: f64 },
    Long { entry_price: f64, quantity: f64 },
}

impl Position {
    pub fn flat(cash: f64) -> Self {
        Position::Flat { cash }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Position::Long { .. })
    }

    /// Cash balance as displayed in the trade log: zero while long.
    pub fn cash(&self) -> f64 {
        match *self {
            Position::Flat { cash } => cash,
            Position::Long { .. } => 0.0,
        }
    }

    /// Value of the account marked at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        match *self {
            Position::Flat { cash } => cash,
            Position::Long { quantity, .. } => quantity * price,
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match *self {
            Position::Flat { .. } => 0.0,
            Position::Long {
                entry_price,
                quantity,
            } => quantity * (price - entry_price),
        }
    }
}
