//! Engine configuration and its validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slack for floating-point comparisons on allocation fractions.
const ALLOCATION_EPSILON: f64 = 1e-9;

/// Configuration for a single backtest run.
///
/// Passed into [`BacktestEngine::new`](super::BacktestEngine::new), which
/// rejects invalid combinations before any simulation happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Maximum concurrently open positions.
    pub max_positions: usize,
    /// Fraction of current equity allocated to each new position.
    pub position_fraction: f64,
    /// Hard stop below entry when a candidate's suggested stop is unusable.
    pub default_stop_pct: f64,
    /// Sessions after a symbol's last exit before it may be entered again.
    /// `None` means a symbol traded once in a run is never re-entered.
    pub reentry_cooldown: Option<usize>,
    /// How many bars to search back for a valid close when today's is missing or invalid.
    pub price_fallback_sessions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            max_positions: 5,
            position_fraction: 0.2,
            default_stop_pct: 0.08,
            reentry_cooldown: None,
            price_fallback_sessions: 10,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_capital: f64, max_positions: usize, position_fraction: f64) -> Self {
        Self {
            initial_capital,
            max_positions,
            position_fraction,
            ..Self::default()
        }
    }

    pub fn with_reentry_cooldown(mut self, sessions: usize) -> Self {
        self.reentry_cooldown = Some(sessions);
        self
    }

    /// Largest fraction of equity that open positions may have committed.
    pub fn committed_fraction(&self) -> f64 {
        self.max_positions as f64 * self.position_fraction
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        if self.max_positions == 0 {
            return Err(ConfigError::NoPositionSlots);
        }
        if !(self.position_fraction > 0.0 && self.position_fraction <= 1.0) {
            return Err(ConfigError::FractionOutOfRange(self.position_fraction));
        }
        let total = self.committed_fraction();
        if total > 1.0 + ALLOCATION_EPSILON {
            return Err(ConfigError::OverAllocated {
                max_positions: self.max_positions,
                position_fraction: self.position_fraction,
                total,
            });
        }
        if !(self.default_stop_pct > 0.0 && self.default_stop_pct < 1.0) {
            return Err(ConfigError::StopOutOfRange(self.default_stop_pct));
        }
        Ok(())
    }
}

/// Invalid engine configuration, reported before any simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial capital must be positive, got {0}")]
    NonPositiveCapital(f64),
    #[error("max_positions must be at least 1")]
    NoPositionSlots,
    #[error("position_fraction must be in (0, 1], got {0}")]
    FractionOutOfRange(f64),
    #[error(
        "max_positions ({max_positions}) x position_fraction ({position_fraction}) = {total} exceeds 1.0"
    )]
    OverAllocated {
        max_positions: usize,
        position_fraction: f64,
        total: f64,
    },
    #[error("default_stop_pct must be in (0, 1), got {0}")]
    StopOutOfRange(f64),
    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}
