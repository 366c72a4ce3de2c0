//! Indicator trait.
//!
//! Indicators are pure functions: bar history in, numeric series out. Strategies
//! evaluate them over a [`HistoryView`](crate::data::HistoryView), so the input
//! already ends at the simulated date.

use crate::domain::Bar;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    /// The first `lookback()` values should be `f64::NAN`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;

    /// Value at the last bar, or `None` during warmup or on NaN input.
    ///
    /// The default computes the whole series; implementations override it when
    /// the last value can be had from a short tail of the history.
    fn latest(&self, bars: &[Bar]) -> Option<f64> {
        self.compute(bars)
            .last()
            .copied()
            .filter(|v| v.is_finite())
    }
}
