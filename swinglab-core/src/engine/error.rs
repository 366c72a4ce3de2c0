use chrono::NaiveDate;
use thiserror::Error;

use super::config::ConfigError;
use crate::domain::PositionError;

/// Fatal backtest errors. A run that fails returns no partial results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("no trading days between {start} and {end}")]
    NoTradingDays { start: NaiveDate, end: NaiveDate },

    #[error("no valid price for {symbol} on or before {date}")]
    InvalidPriceData { symbol: String, date: NaiveDate },

    #[error("position ledger error: {0}")]
    Ledger(#[from] PositionError),
}
