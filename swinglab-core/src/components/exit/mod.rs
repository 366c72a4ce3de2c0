//! Exit strategies: decide whether to close all or part of an open position.
//!
//! Exit strategies run in the engine's exit pass, once per open position per
//! trading day, evaluated on that day's close. They may update the position's
//! trailing fields and their own namespace of strategy-private state; share
//! counts and cash are the engine's alone.

pub mod scaled;
pub mod swing;

pub use scaled::{ProfitTier, ScaledSwingExit};
pub use swing::{SwingExit, SwingParams};

use chrono::NaiveDate;

use crate::data::HistoryView;
use crate::domain::{ExitSignal, Position};

/// Trait for exit strategies.
///
/// # Architecture invariants
/// - `check_exit` sees only bars dated `<= as_of`.
/// - A missing or unusable bar for the position's symbol today yields `hold()`.
/// - A partial exit (`exit_fraction < 1`) must be recorded in the strategy's
///   private state so the same trigger never fires twice.
/// - Stops written to `position.trailing` only ratchet upward.
pub trait ExitStrategy: Send + Sync {
    /// Registry name, also the namespace for this strategy's private state.
    fn name(&self) -> &str;

    /// Decide today's exit for `position`.
    fn check_exit(
        &self,
        position: &mut Position,
        as_of: NaiveDate,
        history: &HistoryView<'_>,
    ) -> ExitSignal;
}
