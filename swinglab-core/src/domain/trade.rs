//! TradeRecord: one realized exit event, flattened for the metrics module.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::exit::ExitReason;
use super::position::{ExitRecord, Position};

/// A closed economic event: one record per full or partial exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,

    // ── Entry ──
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub hard_stop: f64,

    // ── Exit ──
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub reason: ExitReason,
    /// True when shares remained open after this exit.
    pub partial: bool,

    // ── Size and result ──
    pub shares: u64,
    pub pnl: f64,
    /// P&L per unit of initial risk ((entry - hard stop) x shares).
    pub r_multiple: f64,
    pub sessions_held: usize,
}

impl TradeRecord {
    /// Build the record for an exit just applied to `position`.
    pub fn from_exit(position: &Position, exit: &ExitRecord) -> Self {
        let shares = exit.shares as f64;
        let pnl = (exit.price - position.entry_price()) * shares;
        let risk = position.risk_per_share() * shares;
        let r_multiple = if risk > 0.0 { pnl / risk } else { 0.0 };

        Self {
            symbol: position.symbol().to_string(),
            entry_date: position.entry_date(),
            entry_price: position.entry_price(),
            hard_stop: position.hard_stop(),
            exit_date: exit.date,
            exit_price: exit.price,
            reason: exit.reason,
            partial: exit.is_partial(),
            shares: exit.shares,
            pnl,
            r_multiple,
            sessions_held: position.sessions_held(),
        }
    }

    /// Return on the exited shares as a fraction of their entry cost.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 || self.shares == 0 {
            return 0.0;
        }
        self.pnl / (self.entry_price * self.shares as f64)
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }
}
