//! Exit signals: the decision an exit strategy hands back to the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position (or part of it) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    HardStop,
    /// A scale-out profit tier fired.
    ProfitTarget,
    TrailingStop,
    TrendBreak,
    MomentumFade,
    TimeStop,
    /// Forced close at the end of the simulated window.
    EndOfTest,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HardStop => "HARD_STOP",
            Self::ProfitTarget => "PROFIT_TARGET",
            Self::TrailingStop => "TRAILING_STOP",
            Self::TrendBreak => "TREND_BREAK",
            Self::MomentumFade => "MOMENTUM_FADE",
            Self::TimeStop => "TIME_STOP",
            Self::EndOfTest => "END_OF_TEST",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit decision emitted by an exit strategy for one position on one day.
///
/// Immutable and single-use: the engine consumes it in the exit pass of the
/// day it was produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitSignal {
    pub should_exit: bool,
    /// Fraction of the *current* share count to close, in (0, 1].
    pub exit_fraction: f64,
    /// Reference price for the exit (only meaningful when `should_exit`).
    pub price: f64,
    pub reason: Option<ExitReason>,
}

impl ExitSignal {
    /// Keep the position unchanged.
    pub fn hold() -> Self {
        Self {
            should_exit: false,
            exit_fraction: 0.0,
            price: 0.0,
            reason: None,
        }
    }

    /// Close the whole remaining position.
    pub fn full(price: f64, reason: ExitReason) -> Self {
        Self {
            should_exit: true,
            exit_fraction: 1.0,
            price,
            reason: Some(reason),
        }
    }

    /// Close `fraction` of the current shares. Fractions >= 1 become a full exit.
    pub fn partial(fraction: f64, price: f64, reason: ExitReason) -> Self {
        Self {
            should_exit: true,
            exit_fraction: fraction.clamp(0.0, 1.0),
            price,
            reason: Some(reason),
        }
    }

    pub fn is_full(&self) -> bool {
        self.should_exit && self.exit_fraction >= 1.0
    }
}
