//! Price history: the point-in-time data contract between the engine,
//! the strategies, and whatever loaded the bars.
//!
//! - [`PriceHistory`]: provider trait (bars for a symbol through an as-of date,
//!   trading calendar).
//! - [`HistoryView`]: the only handle strategies receive; it cannot address
//!   bars after its as-of date.
//! - [`InMemoryHistory`]: canonicalized, date-indexed in-memory store.
//! - [`synthetic`]: deterministic random-walk bars for tests and benches.

pub mod history;
pub mod memory;
pub mod synthetic;

pub use history::{is_trading_weekday, HistoryView, PriceHistory};
pub use memory::InMemoryHistory;
pub use synthetic::{bars_from_closes, random_walk, WalkParams};

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while building a price history.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("bar has an empty symbol (date {date})")]
    EmptySymbol { date: NaiveDate },
    #[error("duplicate bar for {symbol} on {date}")]
    DuplicateDate { symbol: String, date: NaiveDate },
    #[error("bar for {found} inserted into series for {expected}")]
    SymbolMismatch { expected: String, found: String },
}
