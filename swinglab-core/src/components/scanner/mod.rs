//! Scanners: detect entry opportunities, emit ranked candidates.
//!
//! Scanners are portfolio-agnostic: they receive a clipped history view and
//! nothing about cash, slots, or open positions. The engine decides which
//! candidates become positions.

pub mod breakout;
pub mod pullback;

pub use breakout::BreakoutScanner;
pub use pullback::PullbackScanner;

use chrono::NaiveDate;

use crate::data::HistoryView;
use crate::domain::Candidate;

/// Trait for entry scanners.
///
/// # Architecture invariants
/// - `scan` sees only bars dated `<= as_of` (the view enforces it).
/// - Returned candidates are already ranked: descending score, ties by
///   ascending symbol. The engine consumes them in order and never re-sorts.
/// - Insufficient history for a symbol means "no candidate", never an error.
pub trait Scanner: Send + Sync {
    /// Registry name (e.g., "breakout").
    fn name(&self) -> &str;

    /// Bars of history required before today's bar can be evaluated.
    fn warmup_bars(&self) -> usize;

    /// Candidates for `as_of`, ranked.
    fn scan(&self, as_of: NaiveDate, history: &HistoryView<'_>) -> Vec<Candidate>;
}
