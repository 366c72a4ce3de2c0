//! In-memory, date-indexed price history.
//!
//! Bars are canonicalized on insert: grouped by symbol, sorted by date, and
//! duplicate dates rejected. Insane bars (zero or negative prices, inverted
//! ranges) are kept as delivered and reported with a warning; the engine
//! treats their prices as invalid at the point of use.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use super::history::{is_trading_weekday, PriceHistory};
use super::DataError;
use crate::domain::Bar;

#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    series: BTreeMap<String, Vec<Bar>>,
    calendar: BTreeSet<NaiveDate>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an unordered mix of bars for any number of symbols.
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self, DataError> {
        let mut grouped: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
        for bar in bars {
            if bar.symbol.is_empty() {
                return Err(DataError::EmptySymbol { date: bar.date });
            }
            grouped.entry(bar.symbol.clone()).or_default().push(bar);
        }

        let mut history = Self::new();
        for (symbol, series) in grouped {
            history.insert_series(&symbol, series)?;
        }
        Ok(history)
    }

    /// Insert (or replace) the full series for one symbol.
    pub fn insert_series(&mut self, symbol: &str, mut bars: Vec<Bar>) -> Result<(), DataError> {
        if let Some(bad) = bars.iter().find(|b| b.symbol != symbol) {
            return Err(DataError::SymbolMismatch {
                expected: symbol.to_string(),
                found: bad.symbol.clone(),
            });
        }

        bars.sort_by_key(|b| b.date);
        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(DataError::DuplicateDate {
                symbol: symbol.to_string(),
                date: pair[0].date,
            });
        }

        let insane = bars.iter().filter(|b| !b.is_sane()).count();
        if insane > 0 {
            warn!(symbol, insane, total = bars.len(), "series contains insane bars");
        }

        self.series.insert(symbol.to_string(), bars);
        self.rebuild_calendar();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Full series for a symbol (no as-of clipping). Not exposed to strategies.
    pub fn series(&self, symbol: &str) -> Option<&[Bar]> {
        self.series.get(symbol).map(|v| v.as_slice())
    }

    fn rebuild_calendar(&mut self) {
        self.calendar = self
            .series
            .values()
            .flat_map(|bars| bars.iter().map(|b| b.date))
            .filter(|d| is_trading_weekday(*d))
            .collect();
    }
}

impl PriceHistory for InMemoryHistory {
    fn symbols(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    fn bars_through(&self, symbol: &str, as_of: NaiveDate) -> &[Bar] {
        match self.series.get(symbol) {
            Some(bars) => {
                let end = bars.partition_point(|b| b.date <= as_of);
                &bars[..end]
            }
            None => &[],
        }
    }

    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        self.calendar.range(start..=end).copied().collect()
    }
}
