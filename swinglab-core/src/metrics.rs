//! Performance metrics: pure functions over trades and an equity curve.
//!
//! `summarize` is idempotent: the same inputs always produce the same
//! `Metrics`. Nothing here touches the engine or the price history.

use serde::{Deserialize, Serialize};

use crate::domain::{EquityCurve, TradeRecord};

/// Trading sessions per year for annualisation.
pub const SESSIONS_PER_YEAR: f64 = 252.0;

/// Gross profit over gross loss, or `NoLosers` when nothing lost money.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProfitFactor {
    Ratio(f64),
    NoLosers,
}

/// Statistics over the trade list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub count: usize,
    pub winners: usize,
    pub losers: usize,
    /// Break-even exits; neither winners nor losers.
    pub scratches: usize,
    pub win_rate: f64,
    /// Mean P&L of winning trades.
    pub avg_win: f64,
    /// Mean P&L of losing trades (negative).
    pub avg_loss: f64,
    pub profit_factor: ProfitFactor,
    /// Mean R-multiple.
    pub expectancy_r: f64,
    pub avg_sessions_held: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TradeStats {
    NoTrades,
    Summary(TradeSummary),
}

impl TradeStats {
    pub fn summary(&self) -> Option<&TradeSummary> {
        match self {
            TradeStats::NoTrades => None,
            TradeStats::Summary(s) => Some(s),
        }
    }
}

/// Aggregate metrics for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    pub cagr: f64,
    /// Largest peak-to-trough decline as a negative fraction (-0.15 = 15%).
    pub max_drawdown: f64,
    /// Annualised; `None` when daily returns have no variance.
    pub sharpe: Option<f64>,
    /// Annualised; `None` when there is no downside deviation.
    pub sortino: Option<f64>,
    pub trades: TradeStats,
}

/// Compute all metrics.
///
/// Equity statistics start from `starting_capital`, so P&L booked on the
/// first simulated session counts toward the return.
pub fn summarize(
    trades: &[TradeRecord],
    equity_curve: &EquityCurve,
    starting_capital: f64,
) -> Metrics {
    let equity: Vec<f64> = std::iter::once(starting_capital)
        .chain(equity_curve.values())
        .collect();
    Metrics {
        total_return: total_return(&equity),
        cagr: cagr(&equity),
        max_drawdown: max_drawdown(&equity),
        sharpe: sharpe_ratio(&equity),
        sortino: sortino_ratio(&equity),
        trades: trade_stats(trades),
    }
}

// ─── Trade statistics ───────────────────────────────────────────────

pub fn trade_stats(trades: &[TradeRecord]) -> TradeStats {
    if trades.is_empty() {
        return TradeStats::NoTrades;
    }

    let wins: Vec<&TradeRecord> = trades.iter().filter(|t| t.is_winner()).collect();
    let losses: Vec<&TradeRecord> = trades.iter().filter(|t| t.is_loser()).collect();
    let win_pnl: Vec<f64> = wins.iter().map(|t| t.pnl).collect();
    let loss_pnl: Vec<f64> = losses.iter().map(|t| t.pnl).collect();
    let r_multiples: Vec<f64> = trades
        .iter()
        .map(|t| t.r_multiple)
        .filter(|r| r.is_finite())
        .collect();
    let sessions: Vec<f64> = trades.iter().map(|t| t.sessions_held as f64).collect();

    TradeStats::Summary(TradeSummary {
        count: trades.len(),
        winners: wins.len(),
        losers: losses.len(),
        scratches: trades.len() - wins.len() - losses.len(),
        win_rate: wins.len() as f64 / trades.len() as f64,
        avg_win: mean_f64(&win_pnl),
        avg_loss: mean_f64(&loss_pnl),
        profit_factor: profit_factor(trades),
        expectancy_r: mean_f64(&r_multiples),
        avg_sessions_held: mean_f64(&sessions),
        max_consecutive_wins: max_consecutive(trades, TradeRecord::is_winner),
        max_consecutive_losses: max_consecutive(trades, TradeRecord::is_loser),
    })
}

pub fn profit_factor(trades: &[TradeRecord]) -> ProfitFactor {
    let gross_profit: f64 = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| t.pnl.abs())
        .sum();
    if gross_loss < 1e-10 {
        ProfitFactor::NoLosers
    } else {
        ProfitFactor::Ratio(gross_profit / gross_loss)
    }
}

/// Longest run of trades matching `outcome`. A scratch breaks every streak.
fn max_consecutive(trades: &[TradeRecord], outcome: fn(&TradeRecord) -> bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if outcome(trade) {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

// ─── Equity statistics ──────────────────────────────────────────────

/// (final - initial) / initial.
pub fn total_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&first), Some(&last)) if equity.len() >= 2 && first > 0.0 => (last - first) / first,
        _ => 0.0,
    }
}

/// Compound annual growth over the `equity.len() - 1` session intervals.
pub fn cagr(equity: &[f64]) -> f64 {
    let (Some(&first), Some(&last)) = (equity.first(), equity.last()) else {
        return 0.0;
    };
    if equity.len() < 2 || first <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    let years = (equity.len() - 1) as f64 / SESSIONS_PER_YEAR;
    (last / first).powf(1.0 / years) - 1.0
}

pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

pub fn sharpe_ratio(equity: &[f64]) -> Option<f64> {
    let returns = daily_returns(equity);
    if returns.len() < 2 {
        return None;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return None;
    }
    Some(mean_f64(&returns) / std * SESSIONS_PER_YEAR.sqrt())
}

pub fn sortino_ratio(equity: &[f64]) -> Option<f64> {
    let returns = daily_returns(equity);
    if returns.len() < 2 {
        return None;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return None;
    }
    Some(mean_f64(&returns) / downside_std * SESSIONS_PER_YEAR.sqrt())
}

// ─── Helpers ────────────────────────────────────────────────────────

pub fn daily_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
