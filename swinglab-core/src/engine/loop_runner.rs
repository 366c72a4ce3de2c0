//! Session-by-session simulation loop: the heart of the backtesting engine.
//!
//! Three phases per trading day:
//! 1. Exit pass: every open position, ascending symbol order, through the exit strategy
//! 2. Entry pass: scanner candidates in ranked order, subject to slots, capital, re-entry
//! 3. Equity mark: cash + open positions at today's close
//!
//! After the last day every remaining position is closed as END_OF_TEST.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::config::{ConfigError, EngineConfig};
use super::error::BacktestError;
use super::pricing::resolve_close;
use super::results::{BacktestResults, SkipReason};
use super::sizing::{position_size, shares_to_close};
use super::state::EngineState;
use crate::components::exit::ExitStrategy;
use crate::components::scanner::Scanner;
use crate::data::{HistoryView, PriceHistory};
use crate::domain::{is_valid_price, Candidate, ExitReason, ExitSignal, Position, TradeRecord};
use crate::metrics::summarize;

/// Tolerance when comparing committed capital to its ceiling.
const CEILING_EPSILON: f64 = 1e-6;

/// A configured backtest: one price history, one scanner, one exit strategy.
///
/// The engine holds only shared references and an immutable config, so the
/// same engine can run several date ranges; each `run` starts from a fresh ledger.
pub struct BacktestEngine<'a> {
    config: EngineConfig,
    history: &'a dyn PriceHistory,
    scanner: &'a dyn Scanner,
    exit_strategy: &'a dyn ExitStrategy,
}

impl<'a> BacktestEngine<'a> {
    /// Validates `config` before accepting it.
    pub fn new(
        config: EngineConfig,
        history: &'a dyn PriceHistory,
        scanner: &'a dyn Scanner,
        exit_strategy: &'a dyn ExitStrategy,
    ) -> Result<Self, BacktestError> {
        config.validate()?;
        Ok(Self {
            config,
            history,
            scanner,
            exit_strategy,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Simulate every trading day in `[start, end]`.
    pub fn run(&self, start: NaiveDate, end: NaiveDate) -> Result<BacktestResults, BacktestError> {
        if start > end {
            return Err(ConfigError::InvalidDateRange { start, end }.into());
        }
        let days = self.history.trading_days(start, end);
        let Some(&last_day) = days.last() else {
            return Err(BacktestError::NoTradingDays { start, end });
        };

        info!(
            scanner = self.scanner.name(),
            exit_strategy = self.exit_strategy.name(),
            %start,
            %end,
            sessions = days.len(),
            capital = self.config.initial_capital,
            "backtest started"
        );

        let mut state = EngineState::new(self.config.initial_capital, days.len());

        for (session, &date) in days.iter().enumerate() {
            let view = HistoryView::new(self.history, date);

            // ─── Phase 1: Exit pass ───
            self.exit_pass(&mut state, &view, session)?;

            // ─── Phase 2: Entry pass ───
            self.entry_pass(&mut state, &view, session)?;

            // ─── Phase 3: Equity mark ───
            self.mark_to_market(&mut state, &view)?;
        }
        state.diagnostics.trading_days = days.len();

        self.close_all(&mut state, &HistoryView::new(self.history, last_day), days.len())?;

        let metrics = summarize(
            &state.trades,
            &state.equity_curve,
            self.config.initial_capital,
        );
        info!(
            trades = state.trades.len(),
            entries = state.diagnostics.entries,
            ending_capital = state.cash,
            "backtest finished"
        );

        Ok(BacktestResults {
            scanner: self.scanner.name().to_string(),
            exit_strategy: self.exit_strategy.name().to_string(),
            start,
            end,
            starting_capital: self.config.initial_capital,
            ending_capital: state.cash,
            trades: state.trades,
            equity_curve: state.equity_curve,
            metrics,
            diagnostics: state.diagnostics,
        })
    }

    fn exit_pass(
        &self,
        state: &mut EngineState,
        view: &HistoryView<'_>,
        session: usize,
    ) -> Result<(), BacktestError> {
        let date = view.as_of();
        let symbols: Vec<String> = state.positions.keys().cloned().collect();

        for symbol in symbols {
            let Some(position) = state.positions.get_mut(&symbol) else {
                continue;
            };
            position.tick_session();
            if view.today(&symbol).is_none() {
                state.diagnostics.data_gaps += 1;
            }

            let signal = self.exit_strategy.check_exit(position, date, view);
            if signal.should_exit {
                self.apply_exit(state, &symbol, signal, view, session)?;
            }
        }
        Ok(())
    }

    /// Apply an accepted exit signal: sell shares, credit cash, record the trade.
    fn apply_exit(
        &self,
        state: &mut EngineState,
        symbol: &str,
        signal: ExitSignal,
        view: &HistoryView<'_>,
        session: usize,
    ) -> Result<(), BacktestError> {
        let date = view.as_of();
        let Some(reason) = signal.reason else {
            warn!(symbol, %date, "exit signal without a reason ignored");
            return Ok(());
        };

        let price = if is_valid_price(signal.price) {
            signal.price
        } else {
            let resolved = resolve_close(view, symbol, self.config.price_fallback_sessions)?;
            state.diagnostics.price_fallbacks += 1;
            warn!(
                symbol,
                %date,
                requested = signal.price,
                used = resolved.price,
                from = %resolved.date,
                "invalid exit price, using last valid close"
            );
            resolved.price
        };

        let Some(position) = state.positions.get_mut(symbol) else {
            return Ok(());
        };
        let shares = shares_to_close(position.shares(), signal.exit_fraction);
        if shares == 0 {
            state.diagnostics.ignored_exits += 1;
            debug!(
                symbol,
                %date,
                fraction = signal.exit_fraction,
                held = position.shares(),
                %reason,
                "exit rounds to zero shares, ignored"
            );
            return Ok(());
        }

        let record = position.close_shares(date, shares, price, reason)?;
        let trade = TradeRecord::from_exit(position, &record);
        let closed = !position.is_open();

        state.cash += shares as f64 * price;
        debug!(
            symbol,
            %date,
            shares,
            price,
            %reason,
            pnl = trade.pnl,
            remaining = record.remaining,
            "exit filled"
        );
        state.trades.push(trade);

        if closed {
            state.positions.remove(symbol);
            state.last_exit_session.insert(symbol.to_string(), session);
            state.diagnostics.closed_positions += 1;
        } else {
            state.diagnostics.partial_exits += 1;
        }
        Ok(())
    }

    fn entry_pass(
        &self,
        state: &mut EngineState,
        view: &HistoryView<'_>,
        session: usize,
    ) -> Result<(), BacktestError> {
        if state.open_count() >= self.config.max_positions {
            return Ok(());
        }

        let date = view.as_of();
        let equity = state.cash + self.positions_value(state, view)?;
        let ceiling = self.config.committed_fraction() * equity;

        state.diagnostics.scanner_calls += 1;
        let candidates = self.scanner.scan(date, view);
        state.diagnostics.candidates_seen += candidates.len();

        for candidate in &candidates {
            match self.admit(state, candidate, date, session, equity, ceiling) {
                Ok(position) => {
                    let cost = position.cost_basis();
                    debug!(
                        symbol = %candidate.symbol,
                        %date,
                        shares = position.shares(),
                        price = position.entry_price(),
                        hard_stop = position.hard_stop(),
                        score = candidate.score,
                        "entry filled"
                    );
                    state.cash -= cost;
                    state.positions.insert(candidate.symbol.clone(), position);
                    state.diagnostics.entries += 1;
                }
                Err(reason) => {
                    state.diagnostics.record_skip(reason);
                    debug!(symbol = %candidate.symbol, %date, ?reason, "candidate skipped");
                }
            }
        }
        Ok(())
    }

    /// Decide whether `candidate` becomes a position today.
    fn admit(
        &self,
        state: &EngineState,
        candidate: &Candidate,
        date: NaiveDate,
        session: usize,
        equity: f64,
        ceiling: f64,
    ) -> Result<Position, SkipReason> {
        if state.open_count() >= self.config.max_positions {
            return Err(SkipReason::NoSlot);
        }
        if state.positions.contains_key(&candidate.symbol) {
            return Err(SkipReason::AlreadyHeld);
        }
        if state.reentry_blocked(&candidate.symbol, session, self.config.reentry_cooldown) {
            return Err(SkipReason::ReentryBlocked);
        }
        if candidate.as_of != date {
            return Err(SkipReason::StaleCandidate);
        }
        let entry = candidate.entry_price;
        if !is_valid_price(entry) {
            return Err(SkipReason::InvalidPrice);
        }

        let shares = position_size(equity, self.config.position_fraction, entry);
        let cost = shares as f64 * entry;
        if shares == 0 || cost > state.cash {
            return Err(SkipReason::InsufficientCapital);
        }
        if state.committed_cost() + cost > ceiling + CEILING_EPSILON {
            return Err(SkipReason::InsufficientCapital);
        }

        let hard_stop = match candidate.risk_per_share() {
            Some(_) => candidate.initial_stop,
            None => entry * (1.0 - self.config.default_stop_pct),
        };
        Ok(Position::open(
            candidate.symbol.clone(),
            date,
            entry,
            shares,
            hard_stop,
        ))
    }

    /// Market value of open positions at the view's close, with fallback.
    fn positions_value(
        &self,
        state: &EngineState,
        view: &HistoryView<'_>,
    ) -> Result<f64, BacktestError> {
        let mut value = 0.0;
        for (symbol, position) in &state.positions {
            let resolved = resolve_close(view, symbol, self.config.price_fallback_sessions)?;
            value += position.market_value(resolved.price);
        }
        Ok(value)
    }

    fn mark_to_market(
        &self,
        state: &mut EngineState,
        view: &HistoryView<'_>,
    ) -> Result<(), BacktestError> {
        let mut value = 0.0;
        for (symbol, position) in &state.positions {
            let resolved = resolve_close(view, symbol, self.config.price_fallback_sessions)?;
            if resolved.fallback {
                state.diagnostics.price_fallbacks += 1;
                debug!(symbol = %symbol, date = %view.as_of(), from = %resolved.date, "marked at earlier close");
            }
            value += position.market_value(resolved.price);
        }
        state.record_equity(view.as_of(), value);
        Ok(())
    }

    /// Force-close everything still open at the last valid close.
    fn close_all(
        &self,
        state: &mut EngineState,
        view: &HistoryView<'_>,
        session: usize,
    ) -> Result<(), BacktestError> {
        let symbols: Vec<String> = state.positions.keys().cloned().collect();
        for symbol in symbols {
            let resolved = resolve_close(view, &symbol, self.config.price_fallback_sessions)?;
            if resolved.fallback {
                state.diagnostics.price_fallbacks += 1;
                warn!(
                    symbol = %symbol,
                    date = %view.as_of(),
                    from = %resolved.date,
                    "end-of-test close taken from an earlier bar"
                );
            }
            let signal = ExitSignal::full(resolved.price, ExitReason::EndOfTest);
            self.apply_exit(state, &symbol, signal, view, session)?;
        }
        Ok(())
    }
}
