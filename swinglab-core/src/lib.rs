//! SwingLab Core: domain types, price history, strategy contracts, engine, metrics.
//!
//! This crate contains the whole simulation:
//! - Domain types (bars, candidates, positions, exit signals, trades, equity)
//! - Point-in-time price history that strategies cannot read past
//! - Indicators computed strictly from the bars they are handed
//! - Scanner and exit-strategy traits with reference implementations
//! - The session-by-session backtest engine and its capital ledger
//! - Pure performance metrics
//!
//! Nothing here performs I/O.

pub mod components;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod metrics;

pub use components::{ExitStrategy, Indicator, Scanner};
pub use data::{HistoryView, InMemoryHistory, PriceHistory};
pub use engine::{BacktestEngine, BacktestError, BacktestResults, EngineConfig};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: domain types, strategies, and results are Send + Sync,
    /// so independent runs can be fanned out across threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Candidate>();
        require_sync::<domain::Candidate>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::ExitSignal>();
        require_sync::<domain::ExitSignal>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();
        require_send::<domain::EquityCurve>();
        require_sync::<domain::EquityCurve>();

        // Data and strategies
        require_send::<data::InMemoryHistory>();
        require_sync::<data::InMemoryHistory>();
        require_send::<HistoryView<'static>>();
        require_sync::<HistoryView<'static>>();
        require_send::<components::BreakoutScanner>();
        require_sync::<components::BreakoutScanner>();
        require_send::<components::PullbackScanner>();
        require_sync::<components::PullbackScanner>();
        require_send::<components::SwingExit>();
        require_sync::<components::SwingExit>();
        require_send::<components::ScaledSwingExit>();
        require_sync::<components::ScaledSwingExit>();

        // Engine output
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::BacktestResults>();
        require_sync::<engine::BacktestResults>();
        require_send::<engine::BacktestError>();
        require_sync::<engine::BacktestError>();
        require_send::<metrics::Metrics>();
        require_sync::<metrics::Metrics>();
    }
}
