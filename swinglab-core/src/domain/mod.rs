//! Domain types for SwingLab

pub mod bar;
pub mod candidate;
pub mod equity;
pub mod exit;
pub mod position;
pub mod trade;

pub use bar::{is_valid_price, Bar};
pub use candidate::{rank_candidates, Candidate};
pub use equity::{EquityCurve, EquityPoint};
pub use exit::{ExitReason, ExitSignal};
pub use position::{
    ExitRecord, Position, PositionError, PositionStatus, StateScope, StateValue, StrategyState,
    TrailingState,
};
pub use trade::TradeRecord;
