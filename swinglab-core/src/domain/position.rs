//! Position: the lifecycle of one simulated holding.
//!
//! OPEN → (PARTIAL_EXIT)* → CLOSED. Entry fields, the hard stop and the share
//! count are private: exit strategies can read them but only the engine's exit
//! processing (crate-internal) can reduce shares. Strategies may write to the
//! private-state map and the trailing fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::bar::Bar;
use super::exit::ExitReason;

/// Lifecycle status. A position with partial exits is still `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// One recorded exit event (partial or final).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitRecord {
    pub date: NaiveDate,
    pub shares: u64,
    pub price: f64,
    pub reason: ExitReason,
    /// Shares still held after this exit. Zero means the exit closed the position.
    pub remaining: u64,
}

impl ExitRecord {
    pub fn is_partial(&self) -> bool {
        self.remaining > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("position {symbol} is already closed")]
    AlreadyClosed { symbol: String },
    #[error("cannot close {requested} shares of {symbol}: only {held} held")]
    InsufficientShares {
        symbol: String,
        requested: u64,
        held: u64,
    },
    #[error("exit of zero shares requested for {symbol}")]
    ZeroShares { symbol: String },
}

// ─── Trailing state ─────────────────────────────────────────────────

/// Running trailing-stop fields derived from closing prices.
///
/// The highest favorable close can only be fed from `Bar::close`, never the
/// intraday high. The stop obeys the ratchet rule: it may rise, never fall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailingState {
    highest_close: f64,
    stop: Option<f64>,
}

impl TrailingState {
    pub fn new(entry_price: f64) -> Self {
        Self {
            highest_close: entry_price,
            stop: None,
        }
    }

    /// Fold a bar's close into the running high. Returns true on a new high.
    pub fn observe_close(&mut self, bar: &Bar) -> bool {
        if bar.close.is_finite() && bar.close > self.highest_close {
            self.highest_close = bar.close;
            true
        } else {
            false
        }
    }

    pub fn highest_close(&self) -> f64 {
        self.highest_close
    }

    pub fn stop(&self) -> Option<f64> {
        self.stop
    }

    /// Propose a new stop level. Returns the ratcheted level actually in force.
    pub fn ratchet(&mut self, proposed: f64) -> f64 {
        let level = match self.stop {
            Some(current) => current.max(proposed),
            None => proposed,
        };
        self.stop = Some(level);
        level
    }
}

// ─── Strategy-private state ─────────────────────────────────────────

/// A typed value in the strategy-private state map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum StateValue {
    Flag(bool),
    Number(f64),
    Count(i64),
}

/// Per-position key-value store, namespaced by the strategy that owns the keys.
///
/// Each exit strategy writes only under its own namespace (its `name()`), so
/// two strategies layered on the same position never see each other's keys
/// by accident.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyState {
    namespaces: BTreeMap<String, BTreeMap<String, StateValue>>,
}

impl StrategyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable handle on one namespace, created on first use.
    pub fn scope(&mut self, namespace: &str) -> StateScope<'_> {
        StateScope {
            entries: self.namespaces.entry(namespace.to_string()).or_default(),
        }
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<StateValue> {
        self.namespaces
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .copied()
    }

    /// Missing flags read as `false`.
    pub fn flag(&self, namespace: &str, key: &str) -> bool {
        matches!(self.get(namespace, key), Some(StateValue::Flag(true)))
    }

    pub fn number(&self, namespace: &str, key: &str) -> Option<f64> {
        match self.get(namespace, key) {
            Some(StateValue::Number(v)) => Some(v),
            _ => None,
        }
    }

    /// Missing counters read as zero.
    pub fn count(&self, namespace: &str, key: &str) -> i64 {
        match self.get(namespace, key) {
            Some(StateValue::Count(v)) => v,
            _ => 0,
        }
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.values().all(|entries| entries.is_empty())
    }
}

/// Write access to a single namespace of a [`StrategyState`].
pub struct StateScope<'a> {
    entries: &'a mut BTreeMap<String, StateValue>,
}

impl StateScope<'_> {
    pub fn set_flag(&mut self, key: &str, value: bool) {
        self.entries.insert(key.to_string(), StateValue::Flag(value));
    }

    pub fn set_number(&mut self, key: &str, value: f64) {
        self.entries
            .insert(key.to_string(), StateValue::Number(value));
    }

    pub fn set_count(&mut self, key: &str, value: i64) {
        self.entries.insert(key.to_string(), StateValue::Count(value));
    }

    /// Increment a counter (missing counters start at zero). Returns the new value.
    pub fn increment(&mut self, key: &str) -> i64 {
        let next = match self.entries.get(key) {
            Some(StateValue::Count(v)) => v + 1,
            _ => 1,
        };
        self.set_count(key, next);
        next
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(StateValue::Flag(true)))
    }

    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.entries.remove(key)
    }
}

// ─── Position ───────────────────────────────────────────────────────

/// A long equity holding managed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    symbol: String,
    entry_date: NaiveDate,
    entry_price: f64,
    initial_shares: u64,
    shares: u64,
    hard_stop: f64,
    status: PositionStatus,
    sessions_held: usize,
    exits: Vec<ExitRecord>,
    /// Trailing-stop fields, writable by exit strategies.
    pub trailing: TrailingState,
    /// Strategy-private state, writable by exit strategies.
    pub state: StrategyState,
}

impl Position {
    /// Open a position. The hard stop is fixed here and never recomputed.
    pub fn open(
        symbol: impl Into<String>,
        entry_date: NaiveDate,
        entry_price: f64,
        shares: u64,
        hard_stop: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            entry_date,
            entry_price,
            initial_shares: shares,
            shares,
            hard_stop,
            status: PositionStatus::Open,
            sessions_held: 0,
            exits: Vec::new(),
            trailing: TrailingState::new(entry_price),
            state: StrategyState::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn shares(&self) -> u64 {
        self.shares
    }

    pub fn initial_shares(&self) -> u64 {
        self.initial_shares
    }

    pub fn hard_stop(&self) -> f64 {
        self.hard_stop
    }

    pub fn status(&self) -> PositionStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Trading sessions elapsed since the entry session.
    pub fn sessions_held(&self) -> usize {
        self.sessions_held
    }

    /// Every exit recorded so far, partial and final, in order.
    pub fn exits(&self) -> &[ExitRecord] {
        &self.exits
    }

    pub fn partial_exits(&self) -> impl Iterator<Item = &ExitRecord> {
        self.exits.iter().filter(|e| e.is_partial())
    }

    /// Per-share initial risk: entry minus hard stop.
    pub fn risk_per_share(&self) -> f64 {
        self.entry_price - self.hard_stop
    }

    pub fn cost_basis(&self) -> f64 {
        self.entry_price * self.shares as f64
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    /// Unrealized return as a fraction of the entry price.
    pub fn unrealized_return(&self, price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        price / self.entry_price - 1.0
    }

    /// Best closing return seen so far, from the trailing high.
    pub fn peak_return(&self) -> f64 {
        self.unrealized_return(self.trailing.highest_close())
    }

    /// Advance the session counter. Called once per simulated trading day.
    pub(crate) fn tick_session(&mut self) {
        self.sessions_held += 1;
    }

    /// Remove `shares` from the position. Closing the remainder transitions to CLOSED.
    pub(crate) fn close_shares(
        &mut self,
        date: NaiveDate,
        shares: u64,
        price: f64,
        reason: ExitReason,
    ) -> Result<ExitRecord, PositionError> {
        if self.status == PositionStatus::Closed {
            return Err(PositionError::AlreadyClosed {
                symbol: self.symbol.clone(),
            });
        }
        if shares == 0 {
            return Err(PositionError::ZeroShares {
                symbol: self.symbol.clone(),
            });
        }
        if shares > self.shares {
            return Err(PositionError::InsufficientShares {
                symbol: self.symbol.clone(),
                requested: shares,
                held: self.shares,
            });
        }

        self.shares -= shares;
        if self.shares == 0 {
            self.status = PositionStatus::Closed;
        }

        let record = ExitRecord {
            date,
            shares,
            price,
            reason,
            remaining: self.shares,
        };
        self.exits.push(record.clone());
        Ok(record)
    }
}
