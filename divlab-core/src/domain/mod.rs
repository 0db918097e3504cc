//! Domain types for the divergence backtester

pub mod period;
pub mod position;
pub mod trade;

pub use period::{AnnotatedPeriod, Extrema, PeriodRecord};
pub use position::Position;
pub use trade::{Action, ExitReason, TradeRecord};
