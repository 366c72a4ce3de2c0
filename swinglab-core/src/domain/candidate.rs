//! Candidate: a scanner-proposed entry opportunity for one date.
//!
//! Candidates describe a market event, not a portfolio decision. The engine
//! decides whether a candidate becomes a position (slots, capital, re-entry).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An entry opportunity produced by a scanner for `as_of`.
///
/// `score` is an opaque, strategy-owned ranking value. The engine only uses it
/// through the order in which the scanner returns candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub entry_price: f64,
    /// Suggested initial stop. Becomes the position's hard stop when valid.
    pub initial_stop: f64,
    pub score: f64,
    /// Strategy-specific context (breakout level, SMA values, ...).
    pub payload: BTreeMap<String, f64>,
}

impl Candidate {
    pub fn new(
        symbol: impl Into<String>,
        as_of: NaiveDate,
        entry_price: f64,
        initial_stop: f64,
        score: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            as_of,
            entry_price,
            initial_stop,
            score,
            payload: BTreeMap::new(),
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: f64) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Per-share risk implied by the suggested stop, if the stop sits below entry.
    pub fn risk_per_share(&self) -> Option<f64> {
        let risk = self.entry_price - self.initial_stop;
        (self.initial_stop > 0.0 && risk > 0.0).then_some(risk)
    }
}

/// Sort candidates by descending score, ties broken by ascending symbol.
///
/// Scanners call this before returning so that ranking is reproducible.
pub fn rank_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn ranking_is_descending_with_symbol_tiebreak() {
        let mut list = vec![
            Candidate::new("MSFT", date(), 100.0, 92.0, 0.5),
            Candidate::new("AAPL", date(), 100.0, 92.0, 0.9),
            Candidate::new("AMZN", date(), 100.0, 92.0, 0.5),
        ];
        rank_candidates(&mut list);
        let order: Vec<&str> = list.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(order, vec!["AAPL", "AMZN", "MSFT"]);
    }

    #[test]
    fn risk_per_share_requires_stop_below_entry() {
        let ok = Candidate::new("X", date(), 100.0, 92.0, 1.0);
        assert_eq!(ok.risk_per_share(), Some(8.0));
        let above = Candidate::new("X", date(), 100.0, 101.0, 1.0);
        assert_eq!(above.risk_per_share(), None);
        let zero = Candidate::new("X", date(), 100.0, 0.0, 1.0);
        assert_eq!(zero.risk_per_share(), None);
    }

    #[test]
    fn payload_keeps_deterministic_order() {
        let c = Candidate::new("X", date(), 100.0, 92.0, 1.0)
            .with_payload("roc", 0.12)
            .with_payload("breakout_level", 98.0);
        let keys: Vec<&String> = c.payload.keys().collect();
        assert_eq!(keys, vec!["breakout_level", "roc"]);
    }
}
