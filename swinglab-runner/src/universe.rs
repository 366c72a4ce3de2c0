//! Symbol-subset view over a price history.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use swinglab_core::data::PriceHistory;
use swinglab_core::domain::Bar;

/// A [`PriceHistory`] that exposes only the listed symbols.
///
/// The trading calendar shrinks with it: a day counts only if at least one
/// listed symbol has a bar on it. Symbols absent from the inner history are
/// simply never seen.
pub struct UniverseHistory<'a> {
    inner: &'a dyn PriceHistory,
    symbols: BTreeSet<String>,
}

impl<'a> UniverseHistory<'a> {
    pub fn new(inner: &'a dyn PriceHistory, symbols: impl IntoIterator<Item = String>) -> Self {
        Self {
            inner,
            symbols: symbols.into_iter().collect(),
        }
    }

    /// Listed symbols the inner history has no bars for.
    pub fn missing(&self) -> Vec<String> {
        let known: BTreeSet<String> = self.inner.symbols().into_iter().collect();
        self.symbols.difference(&known).cloned().collect()
    }
}

impl PriceHistory for UniverseHistory<'_> {
    fn symbols(&self) -> Vec<String> {
        self.inner
            .symbols()
            .into_iter()
            .filter(|s| self.symbols.contains(s))
            .collect()
    }

    fn bars_through(&self, symbol: &str, as_of: NaiveDate) -> &[Bar] {
        if self.symbols.contains(symbol) {
            self.inner.bars_through(symbol, as_of)
        } else {
            &[]
        }
    }

    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        self.inner
            .trading_days(start, end)
            .into_iter()
            .filter(|&day| {
                self.symbols.iter().any(|symbol| {
                    self.inner
                        .bars_through(symbol, day)
                        .last()
                        .is_some_and(|bar| bar.date == day)
                })
            })
            .collect()
    }
}
