//! Mutable ledger that evolves session by session during a run.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::results::RunDiagnostics;
use crate::domain::{EquityCurve, EquityPoint, Position, TradeRecord};

/// Cash, open positions, and everything recorded so far.
///
/// Owned exclusively by the engine. Positions are keyed by symbol in a
/// `BTreeMap` so every pass over them runs in ascending symbol order.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub cash: f64,
    pub positions: BTreeMap<String, Position>,
    /// Session index of each symbol's most recent full close.
    pub last_exit_session: BTreeMap<String, usize>,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: EquityCurve,
    pub diagnostics: RunDiagnostics,
}

impl EngineState {
    pub fn new(initial_capital: f64, sessions: usize) -> Self {
        Self {
            cash: initial_capital,
            positions: BTreeMap::new(),
            last_exit_session: BTreeMap::new(),
            trades: Vec::new(),
            equity_curve: EquityCurve::with_capacity(sessions),
            diagnostics: RunDiagnostics::default(),
        }
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    /// Entry cost of the shares still held across open positions.
    pub fn committed_cost(&self) -> f64 {
        self.positions.values().map(|p| p.cost_basis()).sum()
    }

    /// Whether the re-entry policy forbids opening `symbol` at `session`.
    ///
    /// With no cool-down, any symbol closed earlier in the run is blocked for good.
    pub fn reentry_blocked(&self, symbol: &str, session: usize, cooldown: Option<usize>) -> bool {
        match (self.last_exit_session.get(symbol), cooldown) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(&exited), Some(wait)) => session.saturating_sub(exited) < wait,
        }
    }

    /// Append today's equity point. Returns total equity.
    pub fn record_equity(&mut self, date: NaiveDate, positions_value: f64) -> f64 {
        debug_assert!(self.cash >= 0.0, "cash went negative: {}", self.cash);
        let equity = self.cash + positions_value;
        self.equity_curve.push(EquityPoint {
            date,
            cash: self.cash,
            equity,
        });
        equity
    }
}
