//! Deterministic synthetic bars.
//!
//! A seeded random walk on weekdays only. Same seed, same series, on every
//! platform. Used by tests and benchmarks; never mixed with real data.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::history::is_trading_weekday;
use crate::domain::Bar;

/// Shape of a synthetic random walk.
#[derive(Debug, Clone)]
pub struct WalkParams {
    pub start_price: f64,
    /// Mean daily return.
    pub drift: f64,
    /// Half-width of the uniform daily return shock.
    pub volatility: f64,
    pub base_volume: u64,
}

impl Default for WalkParams {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            drift: 0.0005,
            volatility: 0.02,
            base_volume: 1_000_000,
        }
    }
}

/// Generate `sessions` weekday bars for `symbol` starting on or after `start`.
pub fn random_walk(
    symbol: &str,
    start: NaiveDate,
    sessions: usize,
    seed: u64,
    params: &WalkParams,
) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(sessions);
    let mut date = start;
    let mut prev_close = params.start_price;

    while bars.len() < sessions {
        if is_trading_weekday(date) {
            let shock: f64 = rng.gen_range(-params.volatility..=params.volatility);
            let close = (prev_close * (1.0 + params.drift + shock)).max(0.01);
            let open = prev_close;
            let wick: f64 = rng.gen_range(0.0..=params.volatility / 2.0);
            let high = open.max(close) * (1.0 + wick);
            let low = (open.min(close) * (1.0 - wick)).max(0.005);
            let volume_jitter: f64 = rng.gen_range(0.5..1.5);

            bars.push(Bar {
                symbol: symbol.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume: (params.base_volume as f64 * volume_jitter) as u64,
            });
            prev_close = close;
        }
        date += Duration::days(1);
    }

    bars
}

/// Weekday bars from a close series, starting on or after `start`.
///
/// open = previous close (or the close itself on the first bar),
/// high/low = one dollar outside the open-close body, constant volume.
/// A flat series therefore has a true range of exactly 2.0.
pub fn bars_from_closes(symbol: &str, start: NaiveDate, closes: &[f64]) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(closes.len());
    let mut date = start;
    for (i, &close) in closes.iter().enumerate() {
        while !is_trading_weekday(date) {
            date += Duration::days(1);
        }
        let open = if i == 0 { close } else { closes[i - 1] };
        bars.push(Bar {
            symbol: symbol.to_string(),
            date,
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 1_000_000,
        });
        date += Duration::days(1);
    }
    bars
}
