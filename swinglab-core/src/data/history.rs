//! Provider trait and the point-in-time view handed to strategies.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::components::indicator::Indicator;
use crate::domain::Bar;

/// Source of daily bars, addressable by symbol and as-of date.
///
/// # Look-ahead contract
/// `bars_through(symbol, as_of)` must return only bars dated `<= as_of`,
/// ordered by date. Implementations hold pre-loaded data; no I/O happens
/// inside the simulation loop.
pub trait PriceHistory: Send + Sync {
    /// All symbols with data, in ascending order.
    fn symbols(&self) -> Vec<String>;

    /// Ordered bars for `symbol` with `date <= as_of`. Empty if unknown.
    fn bars_through(&self, symbol: &str, as_of: NaiveDate) -> &[Bar];

    /// Trading days in `[start, end]`: dates with at least one bar, weekends excluded.
    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate>;
}

/// True for Monday through Friday.
pub fn is_trading_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Read-only window over a [`PriceHistory`] ending at `as_of`.
///
/// Every lookup is clipped to `date <= as_of`, so a strategy holding a view
/// has no way to reach future bars even if the provider misbehaves.
#[derive(Clone, Copy)]
pub struct HistoryView<'a> {
    history: &'a dyn PriceHistory,
    as_of: NaiveDate,
}

impl<'a> HistoryView<'a> {
    pub fn new(history: &'a dyn PriceHistory, as_of: NaiveDate) -> Self {
        Self { history, as_of }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn symbols(&self) -> Vec<String> {
        self.history.symbols()
    }

    /// Bars for `symbol` up to and including the as-of date.
    pub fn bars(&self, symbol: &str) -> &'a [Bar] {
        let bars = self.history.bars_through(symbol, self.as_of);
        let end = bars.partition_point(|b| b.date <= self.as_of);
        &bars[..end]
    }

    /// Most recent bar on or before the as-of date.
    pub fn latest(&self, symbol: &str) -> Option<&'a Bar> {
        self.bars(symbol).last()
    }

    /// The bar dated exactly on the as-of date, if the symbol traded that day.
    pub fn today(&self, symbol: &str) -> Option<&'a Bar> {
        self.latest(symbol).filter(|b| b.date == self.as_of)
    }

    /// Latest value of `indicator` computed over this view's bars.
    pub fn indicator(&self, symbol: &str, indicator: &dyn Indicator) -> Option<f64> {
        indicator.latest(self.bars(symbol))
    }
}

impl std::fmt::Debug for HistoryView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryView")
            .field("as_of", &self.as_of)
            .finish_non_exhaustive()
    }
}
