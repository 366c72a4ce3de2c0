//! Engine scenarios: one symbol, scripted entries, hand-checked outcomes.
//!
//! Every scenario uses 30 flat warm-up sessions at 100, so ATR(14) is exactly
//! 2.0 on the entry day and all prices below can be verified by hand.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use swinglab_core::components::{ExitStrategy, ScaledSwingExit, Scanner, SwingExit};
use swinglab_core::data::{bars_from_closes, HistoryView, InMemoryHistory, PriceHistory};
use swinglab_core::domain::{Candidate, ExitReason, ExitSignal, Position};
use swinglab_core::engine::{BacktestEngine, BacktestError, ConfigError, EngineConfig};

const WARMUP: usize = 30;

/// Emits pre-arranged candidates on pre-arranged dates.
struct ScriptedScanner {
    script: BTreeMap<NaiveDate, Vec<Candidate>>,
}

impl ScriptedScanner {
    fn new() -> Self {
        Self {
            script: BTreeMap::new(),
        }
    }

    fn on(mut self, date: NaiveDate, candidate: Candidate) -> Self {
        self.script.entry(date).or_default().push(candidate);
        self
    }
}

impl Scanner for ScriptedScanner {
    fn name(&self) -> &str {
        "scripted"
    }

    fn warmup_bars(&self) -> usize {
        0
    }

    fn scan(&self, as_of: NaiveDate, _history: &HistoryView<'_>) -> Vec<Candidate> {
        self.script.get(&as_of).cloned().unwrap_or_default()
    }
}

/// Never exits; positions ride until the end-of-test close.
struct HoldExit;

impl ExitStrategy for HoldExit {
    fn name(&self) -> &str {
        "hold"
    }

    fn check_exit(
        &self,
        _position: &mut Position,
        _as_of: NaiveDate,
        _history: &HistoryView<'_>,
    ) -> ExitSignal {
        ExitSignal::hold()
    }
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Warm-up, the entry bar at 100, then `path`. Returns the history and the
/// dates from the entry day onward.
fn single_symbol(symbol: &str, path: &[f64]) -> (InMemoryHistory, Vec<NaiveDate>) {
    let mut closes = vec![100.0; WARMUP + 1];
    closes.extend_from_slice(path);
    let bars = bars_from_closes(symbol, start(), &closes);
    let dates = bars[WARMUP..].iter().map(|b| b.date).collect();
    (InMemoryHistory::from_bars(bars).unwrap(), dates)
}

/// `single_symbol` for AAA plus a second symbol BBB on the same calendar.
fn two_symbols(aaa: &[f64], bbb: &[f64]) -> (InMemoryHistory, Vec<NaiveDate>) {
    let (mut history, dates) = single_symbol("AAA", aaa);
    let mut closes = vec![100.0; WARMUP + 1];
    closes.extend_from_slice(bbb);
    history
        .insert_series("BBB", bars_from_closes("BBB", start(), &closes))
        .unwrap();
    (history, dates)
}

fn candidate(symbol: &str, date: NaiveDate) -> Candidate {
    Candidate::new(symbol, date, 100.0, 92.0, 1.0)
}

fn run(
    config: EngineConfig,
    history: &InMemoryHistory,
    scanner: &ScriptedScanner,
    exit: &dyn ExitStrategy,
    dates: &[NaiveDate],
) -> Result<swinglab_core::BacktestResults, BacktestError> {
    BacktestEngine::new(config, history, scanner, exit)?.run(dates[0], *dates.last().unwrap())
}

// ── Exit paths ───────────────────────────────────────────────────────

#[test]
fn trailing_stop_round_trip() {
    let (history, dates) = single_symbol("TEST", &[108.0, 115.0, 109.0, 95.0]);
    let scanner = ScriptedScanner::new().on(dates[0], candidate("TEST", dates[0]));
    let exit = SwingExit::default_params();

    let results = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();

    // 20% of 100k at 100 = 200 shares; trail after 115 is 115 - 2 x ATR ~ 111.97.
    assert_eq!(results.trades.len(), 1);
    let trade = &results.trades[0];
    assert_eq!(trade.reason, ExitReason::TrailingStop);
    assert_eq!(trade.exit_date, dates[3]);
    assert_eq!(trade.exit_price, 109.0);
    assert_eq!(trade.shares, 200);
    assert_eq!(trade.sessions_held, 3);
    assert!(!trade.partial);
    assert!((trade.pnl - 1_800.0).abs() < 1e-9);
    assert!((trade.r_multiple - 9.0 / 8.0).abs() < 1e-9);

    assert!((results.ending_capital - 101_800.0).abs() < 1e-9);
    assert_eq!(results.equity_curve.len(), dates.len());
    assert_eq!(results.diagnostics.entries, 1);
    assert_eq!(results.diagnostics.closed_positions, 1);
}

#[test]
fn gap_through_hard_stop_fills_at_stop() {
    let (history, dates) = single_symbol("TEST", &[108.0, 115.0, 90.0]);
    let scanner = ScriptedScanner::new().on(dates[0], candidate("TEST", dates[0]));
    let exit = SwingExit::default_params();

    let results = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();

    assert_eq!(results.trades.len(), 1);
    let trade = &results.trades[0];
    assert_eq!(trade.reason, ExitReason::HardStop);
    assert_eq!(trade.exit_price, 92.0);
    assert!((trade.pnl + 1_600.0).abs() < 1e-9);
    assert!((trade.r_multiple + 1.0).abs() < 1e-9);
}

#[test]
fn time_stop_after_max_hold() {
    let (history, dates) = single_symbol("TEST", &[101.0; 20]);
    let scanner = ScriptedScanner::new().on(dates[0], candidate("TEST", dates[0]));
    let exit = SwingExit::default_params();

    let results = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();

    assert_eq!(results.trades.len(), 1);
    let trade = &results.trades[0];
    assert_eq!(trade.reason, ExitReason::TimeStop);
    assert_eq!(trade.sessions_held, 16);
    assert_eq!(trade.exit_date, dates[16]);
}

#[test]
fn scaled_exit_books_partials_then_trails_remainder() {
    let (history, dates) = single_symbol("TEST", &[109.0, 116.0, 108.0]);
    let scanner = ScriptedScanner::new().on(dates[0], candidate("TEST", dates[0]));
    let exit = ScaledSwingExit::default_params();

    let results = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();

    let summary: Vec<(ExitReason, u64, f64, bool)> = results
        .trades
        .iter()
        .map(|t| (t.reason, t.shares, t.exit_price, t.partial))
        .collect();
    assert_eq!(
        summary,
        vec![
            (ExitReason::ProfitTarget, 50, 109.0, true),
            (ExitReason::ProfitTarget, 50, 116.0, true),
            (ExitReason::TrailingStop, 100, 108.0, false),
        ]
    );
    let shares: u64 = results.trades.iter().map(|t| t.shares).sum();
    assert_eq!(shares, 200);
    assert!((results.realized_pnl() - 2_050.0).abs() < 1e-9);
    assert!((results.net_pnl() - 2_050.0).abs() < 1e-9);
    assert_eq!(results.diagnostics.partial_exits, 2);
}

#[test]
fn scaled_tier_below_one_share_is_not_consumed() {
    let (history, dates) = single_symbol("TEST", &[109.0, 116.0, 108.0]);
    let scanner = ScriptedScanner::new().on(dates[0], candidate("TEST", dates[0]));
    let exit = ScaledSwingExit::default_params();
    let config = EngineConfig::new(300.0, 1, 1.0);

    let results = run(config, &history, &scanner, &exit, &dates).unwrap();

    // Three shares: a quarter tier never rounds up to a whole share.
    assert_eq!(results.trades.len(), 1);
    let trade = &results.trades[0];
    assert_eq!(trade.shares, 3);
    assert!(!trade.partial);
    assert_eq!(trade.reason, ExitReason::TrailingStop);
    assert_eq!(results.diagnostics.ignored_exits, 0);
    assert_eq!(results.diagnostics.partial_exits, 0);
}

#[test]
fn open_position_closed_at_end_of_test() {
    let (history, dates) = single_symbol("TEST", &[101.0, 102.0]);
    let scanner = ScriptedScanner::new().on(dates[0], candidate("TEST", dates[0]));
    let exit = SwingExit::default_params();

    let results = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();

    assert_eq!(results.trades.len(), 1);
    let trade = &results.trades[0];
    assert_eq!(trade.reason, ExitReason::EndOfTest);
    assert_eq!(trade.exit_date, dates[2]);
    assert_eq!(trade.exit_price, 102.0);
    let last = results.equity_curve.last().unwrap();
    assert!((last.equity - results.ending_capital).abs() < 1e-9);
}

#[test]
fn end_of_test_uses_last_valid_close() {
    let (history, dates) = single_symbol("TEST", &[101.0, 102.0, 0.0]);
    let scanner = ScriptedScanner::new().on(dates[0], candidate("TEST", dates[0]));
    let exit = SwingExit::default_params();

    let results = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();

    let trade = &results.trades[0];
    assert_eq!(trade.reason, ExitReason::EndOfTest);
    assert_eq!(trade.exit_date, dates[3]);
    assert_eq!(trade.exit_price, 102.0);
    assert!(results.diagnostics.price_fallbacks >= 1);
}

#[test]
fn held_symbol_without_bar_is_a_data_gap() {
    // OTHER keeps trading after TEST's series ends.
    let (mut history, dates) = single_symbol("TEST", &[101.0]);
    let other = vec![50.0; WARMUP + 4];
    history
        .insert_series("OTHER", bars_from_closes("OTHER", start(), &other))
        .unwrap();
    let all_days = history.trading_days(dates[0], NaiveDate::MAX);
    assert_eq!(all_days.len(), 4);

    let scanner = ScriptedScanner::new().on(dates[0], candidate("TEST", dates[0]));
    let exit = SwingExit::default_params();
    let results = run(EngineConfig::default(), &history, &scanner, &exit, &all_days).unwrap();

    assert_eq!(results.diagnostics.data_gaps, 2);
    let trade = &results.trades[0];
    assert_eq!(trade.reason, ExitReason::EndOfTest);
    assert_eq!(trade.exit_price, 101.0);
    assert_eq!(trade.exit_date, all_days[3]);
}

#[test]
fn unrecoverable_price_aborts_the_run() {
    let (history, dates) = single_symbol("TEST", &[0.0; 6]);
    let scanner = ScriptedScanner::new().on(dates[0], candidate("TEST", dates[0]));
    let exit = SwingExit::default_params();
    let mut config = EngineConfig::default();
    config.price_fallback_sessions = 3;

    let err = run(config, &history, &scanner, &exit, &dates).unwrap_err();
    match err {
        BacktestError::InvalidPriceData { symbol, date } => {
            assert_eq!(symbol, "TEST");
            assert_eq!(date, dates[4]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ── Entry policy ─────────────────────────────────────────────────────

#[test]
fn reentry_blocked_without_cooldown() {
    let (history, dates) = single_symbol("TEST", &[108.0, 115.0, 109.0, 110.0, 111.0]);
    let scanner = ScriptedScanner::new()
        .on(dates[0], candidate("TEST", dates[0]))
        .on(dates[4], Candidate::new("TEST", dates[4], 110.0, 100.0, 1.0));
    let exit = SwingExit::default_params();

    let results = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();

    assert_eq!(results.diagnostics.entries, 1);
    assert_eq!(results.diagnostics.skipped_reentry_blocked, 1);
    assert_eq!(results.trades.len(), 1);
}

#[test]
fn reentry_allowed_after_cooldown() {
    let (history, dates) = single_symbol("TEST", &[108.0, 115.0, 109.0, 110.0, 111.0]);
    let scanner = ScriptedScanner::new()
        .on(dates[0], candidate("TEST", dates[0]))
        .on(dates[4], Candidate::new("TEST", dates[4], 110.0, 100.0, 1.0));
    let exit = SwingExit::default_params();
    let config = EngineConfig::default().with_reentry_cooldown(1);

    let results = run(config, &history, &scanner, &exit, &dates).unwrap();

    assert_eq!(results.diagnostics.entries, 2);
    assert_eq!(results.trades.len(), 2);
    assert_eq!(results.trades[1].entry_date, dates[4]);
    assert_eq!(results.trades[1].reason, ExitReason::EndOfTest);
}

#[test]
fn slots_and_duplicates_are_enforced() {
    let (mut history, dates) = single_symbol("AAA", &[101.0, 102.0]);
    for symbol in ["BBB", "CCC"] {
        let mut closes = vec![100.0; WARMUP + 1];
        closes.extend_from_slice(&[101.0, 102.0]);
        history
            .insert_series(symbol, bars_from_closes(symbol, start(), &closes))
            .unwrap();
    }
    let scanner = ScriptedScanner::new()
        .on(dates[0], candidate("AAA", dates[0]))
        .on(dates[0], candidate("AAA", dates[0]))
        .on(dates[0], candidate("BBB", dates[0]))
        .on(dates[0], candidate("CCC", dates[0]));
    let exit = SwingExit::default_params();
    let config = EngineConfig::new(100_000.0, 2, 0.5);

    let results = run(config, &history, &scanner, &exit, &dates).unwrap();

    assert_eq!(results.diagnostics.entries, 2);
    assert_eq!(results.diagnostics.skipped_already_held, 1);
    assert_eq!(results.diagnostics.skipped_no_slot, 1);
    let mut held: Vec<&str> = results.trades.iter().map(|t| t.symbol.as_str()).collect();
    held.sort_unstable();
    assert_eq!(held, vec!["AAA", "BBB"]);
}

#[test]
fn committed_capital_ceiling_refuses_free_slot() {
    // AAA drops to 60: equity 84k, ceiling 0.8 x 84k = 67.2k, but AAA's
    // 40k cost basis plus BBB's 33.6k would commit 73.6k.
    let (history, dates) = two_symbols(&[60.0, 60.0], &[100.0, 100.0]);
    let scanner = ScriptedScanner::new()
        .on(dates[0], Candidate::new("AAA", dates[0], 100.0, 50.0, 1.0))
        .on(dates[1], candidate("BBB", dates[1]));
    let config = EngineConfig::new(100_000.0, 2, 0.4);

    let results = run(config, &history, &scanner, &HoldExit, &dates).unwrap();

    assert_eq!(results.diagnostics.entries, 1);
    assert_eq!(results.diagnostics.skipped_insufficient_capital, 1);
    assert_eq!(results.diagnostics.skipped_no_slot, 0);
    assert!(results.trades.iter().all(|t| t.symbol == "AAA"));
    let day_one = &results.equity_curve.points()[1];
    assert!((day_one.cash - 60_000.0).abs() < 1e-9);
    assert!((day_one.equity - 84_000.0).abs() < 1e-9);
}

#[test]
fn entry_larger_than_cash_is_refused() {
    // AAA doubles: equity 150k sizes BBB at 750 shares (75k) against 50k cash.
    let (history, dates) = two_symbols(&[200.0, 200.0], &[100.0, 100.0]);
    let scanner = ScriptedScanner::new()
        .on(dates[0], candidate("AAA", dates[0]))
        .on(dates[1], candidate("BBB", dates[1]));
    let config = EngineConfig::new(100_000.0, 2, 0.5);

    let results = run(config, &history, &scanner, &HoldExit, &dates).unwrap();

    assert_eq!(results.diagnostics.entries, 1);
    assert_eq!(results.diagnostics.skipped_insufficient_capital, 1);
    for point in results.equity_curve.points() {
        assert!(point.cash >= 0.0);
    }
    assert!((results.ending_capital - 150_000.0).abs() < 1e-9);
}

#[test]
fn first_session_fill_counts_toward_total_return() {
    // Filled at 95 on a day that closes at 100.
    let (history, dates) = single_symbol("TEST", &[100.0, 100.0]);
    let scanner =
        ScriptedScanner::new().on(dates[0], Candidate::new("TEST", dates[0], 95.0, 87.0, 1.0));

    let results = run(EngineConfig::default(), &history, &scanner, &HoldExit, &dates).unwrap();

    // 210 shares at 95 marked at 100.
    assert!((results.equity_curve.points()[0].equity - 101_050.0).abs() < 1e-9);
    assert!((results.ending_capital - 101_050.0).abs() < 1e-9);
    let expected = (results.ending_capital - results.starting_capital) / results.starting_capital;
    assert!((results.metrics.total_return - expected).abs() < 1e-12);
    assert!((results.metrics.total_return - 0.0105).abs() < 1e-9);
}

#[test]
fn stale_and_unpriced_candidates_are_skipped() {
    let (history, dates) = single_symbol("TEST", &[101.0, 102.0]);
    let scanner = ScriptedScanner::new()
        .on(dates[0], candidate("TEST", dates[1]))
        .on(dates[1], Candidate::new("TEST", dates[1], f64::NAN, 92.0, 1.0));
    let exit = SwingExit::default_params();

    let results = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();

    assert!(results.trades.is_empty());
    assert_eq!(results.diagnostics.skipped_stale_candidate, 1);
    assert_eq!(results.diagnostics.skipped_invalid_price, 1);
    assert_eq!(results.ending_capital, 100_000.0);
}

#[test]
fn missing_stop_uses_default_stop_pct() {
    let (history, dates) = single_symbol("TEST", &[101.0]);
    let scanner =
        ScriptedScanner::new().on(dates[0], Candidate::new("TEST", dates[0], 100.0, 0.0, 1.0));
    let exit = SwingExit::default_params();

    let results = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();

    assert!((results.trades[0].hard_stop - 92.0).abs() < 1e-9);
}

// ── Errors and determinism ───────────────────────────────────────────

#[test]
fn invalid_config_is_rejected() {
    let (history, _) = single_symbol("TEST", &[101.0]);
    let scanner = ScriptedScanner::new();
    let exit = SwingExit::default_params();

    let over = EngineConfig::new(100_000.0, 6, 0.2);
    let err = BacktestEngine::new(over, &history, &scanner, &exit).err().unwrap();
    assert!(matches!(err, BacktestError::Config(ConfigError::OverAllocated { .. })));

    let broke = EngineConfig::new(0.0, 5, 0.2);
    let err = BacktestEngine::new(broke, &history, &scanner, &exit).err().unwrap();
    assert!(matches!(err, BacktestError::Config(ConfigError::NonPositiveCapital(_))));
}

#[test]
fn bad_date_ranges_are_errors() {
    let (history, dates) = single_symbol("TEST", &[101.0]);
    let scanner = ScriptedScanner::new();
    let exit = SwingExit::default_params();
    let engine = BacktestEngine::new(EngineConfig::default(), &history, &scanner, &exit).unwrap();

    let err = engine.run(dates[1], dates[0]).unwrap_err();
    assert!(matches!(err, BacktestError::Config(ConfigError::InvalidDateRange { .. })));

    let far = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    let err = engine.run(far, far + chrono::Duration::days(30)).unwrap_err();
    assert!(matches!(err, BacktestError::NoTradingDays { .. }));
}

#[test]
fn no_candidates_means_flat_equity() {
    let (history, dates) = single_symbol("TEST", &[101.0, 99.0, 104.0]);
    let scanner = ScriptedScanner::new();
    let exit = SwingExit::default_params();

    let results = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();

    assert!(results.trades.is_empty());
    assert_eq!(results.ending_capital, 100_000.0);
    assert!(results
        .equity_curve
        .points()
        .iter()
        .all(|p| p.equity == 100_000.0));
    assert_eq!(results.metrics.total_return, 0.0);
    assert_eq!(results.diagnostics.scanner_calls, dates.len());
}

#[test]
fn identical_inputs_identical_results() {
    let (history, dates) = single_symbol("TEST", &[109.0, 116.0, 108.0, 111.0]);
    let scanner = ScriptedScanner::new().on(dates[0], candidate("TEST", dates[0]));
    let exit = ScaledSwingExit::default_params();

    let a = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();
    let b = run(EngineConfig::default(), &history, &scanner, &exit, &dates).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}
