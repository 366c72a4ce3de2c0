//! Look-ahead contamination tests.
//!
//! No value computed for day t may depend on bars dated after t.
//!
//! Indicators: compute on a truncated series (bars 0..150) and the full series
//! (bars 0..300) and require identical values over the shared prefix.
//!
//! Engine: run against a provider that ignores `as_of` and hands out its whole
//! series. Results must match a run against an honest provider, and a run cut
//! short must agree with the full run on every day it covers.

use chrono::NaiveDate;
use std::sync::Mutex;

use swinglab_core::components::{
    BreakoutScanner, ExitStrategy, Indicator, PullbackScanner, ScaledSwingExit, Scanner, SwingExit,
};
use swinglab_core::data::{random_walk, InMemoryHistory, PriceHistory, WalkParams};
use swinglab_core::domain::Bar;
use swinglab_core::engine::{BacktestEngine, EngineConfig};
use swinglab_core::indicators::{Atr, HighestClose, Roc, Sma};

const FULL_LEN: usize = 300;
const TRUNCATED_LEN: usize = 150;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn trending() -> WalkParams {
    WalkParams {
        drift: 0.002,
        volatility: 0.025,
        ..WalkParams::default()
    }
}

fn universe() -> InMemoryHistory {
    let mut bars = Vec::new();
    for (seed, symbol) in ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"].iter().enumerate() {
        bars.extend(random_walk(symbol, start(), FULL_LEN, seed as u64 + 11, &trending()));
    }
    InMemoryHistory::from_bars(bars).unwrap()
}

fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let truncated = &full_bars[..truncated_len];
    let full_result = indicator.compute(full_bars);
    let truncated_result = indicator.compute(truncated);

    assert_eq!(truncated_result.len(), truncated_len, "{}: length", indicator.name());
    assert_eq!(full_result.len(), full_bars.len(), "{}: length", indicator.name());

    for i in 0..truncated_len {
        let t = truncated_result[i];
        let f = full_result[i];
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            !t.is_nan() && !f.is_nan(),
            "{}: NaN mismatch at bar {i} (truncated={t}, full={f})",
            indicator.name()
        );
        assert!(
            (t - f).abs() < 1e-10,
            "{}: LOOKAHEAD at bar {i}: truncated={t}, full={f}",
            indicator.name()
        );
    }

    // The incremental accessor must agree with the batch series.
    match indicator.latest(truncated) {
        Some(v) => assert!((v - truncated_result[truncated_len - 1]).abs() < 1e-10),
        None => assert!(truncated_result[truncated_len - 1].is_nan()),
    }
}

fn walk_bars() -> Vec<Bar> {
    random_walk("TEST", start(), FULL_LEN, 42, &trending())
}

// ── Indicators ───────────────────────────────────────────────────────

#[test]
fn lookahead_sma() {
    let bars = walk_bars();
    for period in [1, 10, 50] {
        assert_no_lookahead(&Sma::new(period), &bars, TRUNCATED_LEN);
    }
}

#[test]
fn lookahead_atr() {
    let bars = walk_bars();
    for period in [5, 14] {
        assert_no_lookahead(&Atr::new(period), &bars, TRUNCATED_LEN);
    }
}

#[test]
fn lookahead_highest_close() {
    let bars = walk_bars();
    assert_no_lookahead(&HighestClose::new(20), &bars, TRUNCATED_LEN);
}

#[test]
fn lookahead_roc() {
    let bars = walk_bars();
    for period in [1, 20] {
        assert_no_lookahead(&Roc::new(period), &bars, TRUNCATED_LEN);
    }
}

#[test]
fn lookahead_every_cut_point_atr() {
    let bars = walk_bars();
    let atr = Atr::new(14);
    for cut in [1, 2, 14, 15, 16, 299] {
        assert_no_lookahead(&atr, &bars, cut);
    }
}

// ── Engine ───────────────────────────────────────────────────────────

/// Provider that breaks the look-ahead contract: `bars_through` returns the
/// whole series. Records every `as_of` it is asked about.
struct LeakyHistory {
    inner: InMemoryHistory,
    requests: Mutex<Vec<NaiveDate>>,
}

impl LeakyHistory {
    fn new(inner: InMemoryHistory) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl PriceHistory for LeakyHistory {
    fn symbols(&self) -> Vec<String> {
        self.inner.symbols()
    }

    fn bars_through(&self, symbol: &str, as_of: NaiveDate) -> &[Bar] {
        self.requests.lock().unwrap().push(as_of);
        self.inner.series(symbol).unwrap_or(&[])
    }

    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        self.inner.trading_days(start, end)
    }
}

fn run_window(
    history: &dyn PriceHistory,
    scanner: &dyn Scanner,
    exit: &dyn ExitStrategy,
    from: NaiveDate,
    to: NaiveDate,
) -> swinglab_core::BacktestResults {
    BacktestEngine::new(EngineConfig::default(), history, scanner, exit)
        .unwrap()
        .run(from, to)
        .unwrap()
}

#[test]
fn leaky_provider_cannot_change_results() {
    let honest = universe();
    let leaky = LeakyHistory::new(universe());
    let days = honest.trading_days(start(), NaiveDate::MAX);
    let (from, to) = (days[60], days[FULL_LEN - 1]);

    let scanner = BreakoutScanner::new(10, 20, 10, 0.0, 0.08);
    let exit = SwingExit::default_params();

    let expected = run_window(&honest, &scanner, &exit, from, to);
    let actual = run_window(&leaky, &scanner, &exit, from, to);
    assert!(!expected.trades.is_empty(), "scenario should trade");
    assert_eq!(expected, actual);

    // The engine itself only ever asks about simulated days, in order.
    let requests = leaky.requests.lock().unwrap();
    assert!(!requests.is_empty());
    assert!(requests.windows(2).all(|w| w[0] <= w[1]));
    assert!(requests.iter().all(|d| *d >= from && *d <= to));
}

#[test]
fn truncated_run_matches_full_run_prefix() {
    let history = universe();
    let days = history.trading_days(start(), NaiveDate::MAX);
    let from = days[60];
    let mid = days[180];
    let to = days[FULL_LEN - 1];

    let scanner = PullbackScanner::new(5, 20, 0.03, 0.08);
    let exit = ScaledSwingExit::default_params();

    let short = run_window(&history, &scanner, &exit, from, mid);
    let full = run_window(&history, &scanner, &exit, from, to);

    let short_points = short.equity_curve.points();
    let full_points = &full.equity_curve.points()[..short_points.len()];
    assert_eq!(short_points, full_points);

    let settled = |r: &swinglab_core::BacktestResults| {
        r.trades
            .iter()
            .filter(|t| t.exit_date < mid)
            .cloned()
            .collect::<Vec<_>>()
    };
    assert_eq!(settled(&short), settled(&full));
}
