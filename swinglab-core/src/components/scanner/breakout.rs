//! Breakout scanner: close clears the prior N-session high on expanding volume.

use chrono::NaiveDate;
use tracing::debug;

use super::Scanner;
use crate::components::indicator::Indicator;
use crate::data::HistoryView;
use crate::domain::{is_valid_price, rank_candidates, Bar, Candidate};
use crate::indicators::{HighestClose, Roc, Sma};

/// Fires when, on the as-of bar:
/// - close > highest close of the prior `lookback` sessions,
/// - close > SMA(`trend_period`),
/// - volume >= `min_volume_ratio` x average volume of the prior `volume_period` sessions.
///
/// Score is the ROC over `lookback`. The suggested stop sits `stop_pct` below entry.
#[derive(Debug, Clone)]
pub struct BreakoutScanner {
    pub lookback: usize,
    pub trend_period: usize,
    pub volume_period: usize,
    pub min_volume_ratio: f64,
    pub stop_pct: f64,
    highest: HighestClose,
    trend: Sma,
    roc: Roc,
}

impl BreakoutScanner {
    pub fn new(
        lookback: usize,
        trend_period: usize,
        volume_period: usize,
        min_volume_ratio: f64,
        stop_pct: f64,
    ) -> Self {
        assert!(lookback >= 1, "lookback must be >= 1");
        assert!(volume_period >= 1, "volume_period must be >= 1");
        assert!(
            stop_pct > 0.0 && stop_pct < 1.0,
            "stop_pct must be in (0, 1)"
        );
        Self {
            lookback,
            trend_period,
            volume_period,
            min_volume_ratio,
            stop_pct,
            highest: HighestClose::new(lookback),
            trend: Sma::new(trend_period),
            roc: Roc::new(lookback),
        }
    }

    pub fn default_params() -> Self {
        Self::new(20, 50, 20, 1.5, 0.08)
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Option<Candidate> {
        let today = bars.last()?;
        if !is_valid_price(today.close) {
            return None;
        }

        let level = self.highest.latest(bars)?;
        if today.close <= level {
            return None;
        }

        let sma = self.trend.latest(bars)?;
        if today.close <= sma {
            return None;
        }

        let prior = &bars[bars.len() - 1 - self.volume_period..bars.len() - 1];
        let avg_volume = prior.iter().map(|b| b.volume as f64).sum::<f64>() / prior.len() as f64;
        if avg_volume <= 0.0 {
            return None;
        }
        let volume_ratio = today.volume as f64 / avg_volume;
        if volume_ratio < self.min_volume_ratio {
            return None;
        }

        let roc = self.roc.latest(bars)?;
        let entry = today.close;
        Some(
            Candidate::new(symbol, today.date, entry, entry * (1.0 - self.stop_pct), roc)
                .with_payload("breakout_level", level)
                .with_payload("trend_sma", sma)
                .with_payload("roc", roc)
                .with_payload("volume_ratio", volume_ratio),
        )
    }
}

impl Scanner for BreakoutScanner {
    fn name(&self) -> &str {
        "breakout"
    }

    fn warmup_bars(&self) -> usize {
        self.lookback
            .max(self.trend_period.saturating_sub(1))
            .max(self.volume_period)
    }

    fn scan(&self, as_of: NaiveDate, history: &HistoryView<'_>) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        let mut short_history = 0usize;

        for symbol in history.symbols() {
            let bars = history.bars(&symbol);
            if history.today(&symbol).is_none() {
                continue;
            }
            if bars.len() <= self.warmup_bars() {
                short_history += 1;
                continue;
            }
            if let Some(candidate) = self.evaluate(&symbol, bars) {
                candidates.push(candidate);
            }
        }

        if short_history > 0 {
            debug!(
                scanner = self.name(),
                %as_of,
                symbols = short_history,
                needed = self.warmup_bars() + 1,
                "insufficient history"
            );
        }

        rank_candidates(&mut candidates);
        candidates
    }
}
