//! Trade simulator — a two-state (FLAT/LONG) machine over an annotated series.
//!
//! Per period, in order:
//! 1. FLAT: enter long with the whole cash balance on oversold + bullish divergence
//! 2. LONG: exit on overbought + bearish divergence, or on the stop-loss
//! 3. Otherwise carry the state forward
//!
//! Entry and exit are gated on disjoint states, so at most one fires per period.

pub mod loop_runner;
pub mod state;
pub mod summary;

pub use loop_runner::{run_strategy, simulate, SimulationError};
pub use state::{SimulationResult, SimulationState};
pub use summary::TradeSummary;
