//! Backtesting engine: session-by-session simulation over a price history.
//!
//! The engine owns the capital ledger and every open position. Strategies
//! reach it only through the `Scanner` and `ExitStrategy` traits; the
//! engine never exposes cash or slots to them.

pub mod config;
pub mod error;
pub mod loop_runner;
pub mod pricing;
pub mod results;
pub mod sizing;
pub mod state;

pub use config::{ConfigError, EngineConfig};
pub use error::BacktestError;
pub use loop_runner::BacktestEngine;
pub use pricing::{resolve_close, ResolvedPrice};
pub use results::{BacktestResults, RunDiagnostics, SkipReason};
pub use sizing::{position_size, shares_to_close};
pub use state::EngineState;
