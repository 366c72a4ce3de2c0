//! Run output: results, diagnostics, and skip accounting.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{EquityCurve, TradeRecord};
use crate::metrics::Metrics;

/// Why a candidate did not become a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyHeld,
    ReentryBlocked,
    NoSlot,
    InsufficientCapital,
    InvalidPrice,
    /// Candidate dated for a different session than the one being simulated.
    StaleCandidate,
}

/// Counters collected during a run. Recoverable conditions end up here
/// instead of in an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub trading_days: usize,
    pub scanner_calls: usize,
    pub candidates_seen: usize,
    pub entries: usize,
    pub partial_exits: usize,
    pub closed_positions: usize,
    pub skipped_already_held: usize,
    pub skipped_reentry_blocked: usize,
    pub skipped_no_slot: usize,
    pub skipped_insufficient_capital: usize,
    pub skipped_invalid_price: usize,
    pub skipped_stale_candidate: usize,
    /// Exit signals whose share count rounded down to zero.
    pub ignored_exits: usize,
    /// Exit checks on held symbols with no bar that day.
    pub data_gaps: usize,
    /// Marks and fills priced from an earlier close.
    pub price_fallbacks: usize,
}

impl RunDiagnostics {
    pub fn record_skip(&mut self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::AlreadyHeld => &mut self.skipped_already_held,
            SkipReason::ReentryBlocked => &mut self.skipped_reentry_blocked,
            SkipReason::NoSlot => &mut self.skipped_no_slot,
            SkipReason::InsufficientCapital => &mut self.skipped_insufficient_capital,
            SkipReason::InvalidPrice => &mut self.skipped_invalid_price,
            SkipReason::StaleCandidate => &mut self.skipped_stale_candidate,
        };
        *counter += 1;
    }

    pub fn total_skips(&self) -> usize {
        self.skipped_already_held
            + self.skipped_reentry_blocked
            + self.skipped_no_slot
            + self.skipped_insufficient_capital
            + self.skipped_invalid_price
            + self.skipped_stale_candidate
    }
}

/// Result of a complete backtest run. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResults {
    pub scanner: String,
    pub exit_strategy: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub starting_capital: f64,
    /// Cash after every position was closed.
    pub ending_capital: f64,
    /// One record per full or partial exit, in fill order.
    pub trades: Vec<TradeRecord>,
    pub equity_curve: EquityCurve,
    pub metrics: Metrics,
    pub diagnostics: RunDiagnostics,
}

impl BacktestResults {
    pub fn net_pnl(&self) -> f64 {
        self.ending_capital - self.starting_capital
    }

    /// Sum of realized P&L over all trade records.
    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }
}
