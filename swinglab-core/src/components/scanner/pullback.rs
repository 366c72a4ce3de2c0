//! Pullback scanner: an uptrend dipping back to its short average and turning up.

use chrono::NaiveDate;
use tracing::debug;

use super::Scanner;
use crate::components::indicator::Indicator;
use crate::data::HistoryView;
use crate::domain::{is_valid_price, rank_candidates, Bar, Candidate};
use crate::indicators::Sma;

/// Fires when, on the as-of bar:
/// - close > SMA(`long_period`),
/// - |close / SMA(`short_period`) - 1| <= `band_pct`,
/// - close > previous close.
///
/// Score is the short/long SMA spread: stronger trends rank first.
#[derive(Debug, Clone)]
pub struct PullbackScanner {
    pub short_period: usize,
    pub long_period: usize,
    pub band_pct: f64,
    pub stop_pct: f64,
    short: Sma,
    long: Sma,
}

impl PullbackScanner {
    pub fn new(short_period: usize, long_period: usize, band_pct: f64, stop_pct: f64) -> Self {
        assert!(
            short_period < long_period,
            "short_period must be below long_period"
        );
        assert!(band_pct >= 0.0, "band_pct must be non-negative");
        assert!(
            stop_pct > 0.0 && stop_pct < 1.0,
            "stop_pct must be in (0, 1)"
        );
        Self {
            short_period,
            long_period,
            band_pct,
            stop_pct,
            short: Sma::new(short_period),
            long: Sma::new(long_period),
        }
    }

    pub fn default_params() -> Self {
        Self::new(10, 50, 0.02, 0.08)
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Option<Candidate> {
        let (today, prev) = match bars {
            [.., prev, today] => (today, prev),
            _ => return None,
        };
        if !is_valid_price(today.close) || today.close <= prev.close {
            return None;
        }

        let long = self.long.latest(bars)?;
        let short = self.short.latest(bars)?;
        if today.close <= long || long <= 0.0 {
            return None;
        }
        if (today.close / short - 1.0).abs() > self.band_pct {
            return None;
        }

        let spread = short / long - 1.0;
        let entry = today.close;
        Some(
            Candidate::new(symbol, today.date, entry, entry * (1.0 - self.stop_pct), spread)
                .with_payload("short_sma", short)
                .with_payload("long_sma", long),
        )
    }
}

impl Scanner for PullbackScanner {
    fn name(&self) -> &str {
        "pullback"
    }

    fn warmup_bars(&self) -> usize {
        self.long_period - 1
    }

    fn scan(&self, as_of: NaiveDate, history: &HistoryView<'_>) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        let mut short_history = 0usize;

        for symbol in history.symbols() {
            if history.today(&symbol).is_none() {
                continue;
            }
            let bars = history.bars(&symbol);
            if bars.len() <= self.warmup_bars() {
                short_history += 1;
                continue;
            }
            candidates.extend(self.evaluate(&symbol, bars));
        }

        if short_history > 0 {
            debug!(
                scanner = self.name(),
                %as_of,
                symbols = short_history,
                "insufficient history"
            );
        }

        rank_candidates(&mut candidates);
        candidates
    }
}
