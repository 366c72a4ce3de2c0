//! Swing exit: hard stop, tiered ATR trail, trend break, momentum fade, time stop.
//!
//! Rules are evaluated on the as-of close in priority order; the first match
//! wins. When nothing fires, the day's close is folded into the trailing
//! state and the trail for the next session is computed and ratcheted.
//!
//! Trail distance by peak closing gain:
//! - below `tighten_at`: highest close - `wide_atr_mult` x ATR
//! - `tighten_at` to `fixed_trail_at`: highest close - `tight_atr_mult` x ATR
//! - above `fixed_trail_at`: highest close x (1 - `fixed_trail_pct`)
//!
//! Without a usable ATR (warm-up) the fixed-percentage trail is used.

use chrono::NaiveDate;
use tracing::debug;

use super::ExitStrategy;
use crate::data::HistoryView;
use crate::domain::{is_valid_price, Bar, ExitReason, ExitSignal, Position};
use crate::indicators::{Atr, Sma};

/// State namespace and registry name.
pub const NAMESPACE: &str = "swing";
const TRAIL_ACTIVE: &str = "trail_active";
const SESSIONS_SINCE_HIGH: &str = "sessions_since_high";

/// Thresholds for [`SwingExit`]. Returns are fractions of the entry price.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingParams {
    /// Peak gain that arms the trailing stop.
    pub trail_activation: f64,
    pub atr_period: usize,
    pub wide_atr_mult: f64,
    pub tight_atr_mult: f64,
    /// Peak gain at which the trail tightens to `tight_atr_mult`.
    pub tighten_at: f64,
    /// Peak gain above which the trail becomes a fixed percentage.
    pub fixed_trail_at: f64,
    pub fixed_trail_pct: f64,
    /// Below this gain, a close under the trend SMA exits.
    pub protect_gains: f64,
    pub trend_sma: usize,
    /// Peak gain after which stalling counts as momentum fade.
    pub fade_threshold: f64,
    /// Sessions without a new highest close before momentum fade fires.
    pub fade_window: usize,
    /// Time stop: exit once sessions held exceeds this.
    pub max_hold_days: usize,
}

impl Default for SwingParams {
    fn default() -> Self {
        Self {
            trail_activation: 0.05,
            atr_period: 14,
            wide_atr_mult: 2.0,
            tight_atr_mult: 1.0,
            tighten_at: 0.10,
            fixed_trail_at: 0.15,
            fixed_trail_pct: 0.05,
            protect_gains: 0.03,
            trend_sma: 10,
            fade_threshold: 0.05,
            fade_window: 3,
            max_hold_days: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SwingExit {
    params: SwingParams,
    atr: Atr,
    trend: Sma,
}

impl SwingExit {
    pub fn new(params: SwingParams) -> Self {
        assert!(params.fade_window >= 1, "fade_window must be >= 1");
        assert!(
            params.fixed_trail_pct > 0.0 && params.fixed_trail_pct < 1.0,
            "fixed_trail_pct must be in (0, 1)"
        );
        Self {
            atr: Atr::new(params.atr_period),
            trend: Sma::new(params.trend_sma),
            params,
        }
    }

    pub fn default_params() -> Self {
        Self::new(SwingParams::default())
    }

    pub fn params(&self) -> &SwingParams {
        &self.params
    }

    /// Rules 2-5 against the trailing state left by the previous session.
    pub(crate) fn managed_exit(
        &self,
        position: &Position,
        bar: &Bar,
        history: &HistoryView<'_>,
    ) -> Option<ExitSignal> {
        let p = &self.params;
        let close = bar.close;

        if position.state.flag(NAMESPACE, TRAIL_ACTIVE) {
            if let Some(stop) = position.trailing.stop() {
                if close < stop {
                    return Some(ExitSignal::full(close, ExitReason::TrailingStop));
                }
            }
        }

        if position.unrealized_return(close) < p.protect_gains {
            if let Some(sma) = history.indicator(position.symbol(), &self.trend) {
                if close < sma {
                    return Some(ExitSignal::full(close, ExitReason::TrendBreak));
                }
            }
        }

        if close <= position.trailing.highest_close() && position.peak_return() > p.fade_threshold {
            let stale = position.state.count(NAMESPACE, SESSIONS_SINCE_HIGH) + 1;
            if stale >= p.fade_window as i64 {
                return Some(ExitSignal::full(close, ExitReason::MomentumFade));
            }
        }

        if position.sessions_held() > p.max_hold_days {
            return Some(ExitSignal::full(close, ExitReason::TimeStop));
        }

        None
    }

    /// End-of-day bookkeeping for a position that stays open.
    pub(crate) fn advance(&self, position: &mut Position, bar: &Bar, history: &HistoryView<'_>) {
        let new_high = position.trailing.observe_close(bar);
        {
            let mut scope = position.state.scope(NAMESPACE);
            if new_high {
                scope.set_count(SESSIONS_SINCE_HIGH, 0);
            } else {
                scope.increment(SESSIONS_SINCE_HIGH);
            }
        }

        let peak = position.peak_return();
        if !position.state.flag(NAMESPACE, TRAIL_ACTIVE) {
            if peak < self.params.trail_activation {
                return;
            }
            position.state.scope(NAMESPACE).set_flag(TRAIL_ACTIVE, true);
            debug!(symbol = position.symbol(), date = %bar.date, peak, "trailing stop armed");
        }

        let atr = history.indicator(position.symbol(), &self.atr);
        let proposed = self.trail_level(position.trailing.highest_close(), peak, atr);
        position.trailing.ratchet(proposed);
    }

    /// Trail for the next session, before ratcheting.
    pub fn trail_level(&self, highest_close: f64, peak_gain: f64, atr: Option<f64>) -> f64 {
        let p = &self.params;
        let fixed = highest_close * (1.0 - p.fixed_trail_pct);
        if peak_gain > p.fixed_trail_at {
            return fixed;
        }
        let mult = if peak_gain >= p.tighten_at {
            p.tight_atr_mult
        } else {
            p.wide_atr_mult
        };
        match atr {
            Some(atr) if atr > 0.0 => highest_close - mult * atr,
            _ => fixed,
        }
    }
}

/// Today's usable bar for the position, or `None` when the strategy must hold.
pub(crate) fn usable_bar<'a>(position: &Position, history: &HistoryView<'a>) -> Option<&'a Bar> {
    let Some(bar) = history.today(position.symbol()) else {
        debug!(symbol = position.symbol(), date = %history.as_of(), "no bar today, holding");
        return None;
    };
    if !is_valid_price(bar.close) {
        debug!(symbol = position.symbol(), date = %bar.date, close = bar.close, "invalid close, holding");
        return None;
    }
    Some(bar)
}

impl ExitStrategy for SwingExit {
    fn name(&self) -> &str {
        NAMESPACE
    }

    fn check_exit(
        &self,
        position: &mut Position,
        _as_of: NaiveDate,
        history: &HistoryView<'_>,
    ) -> ExitSignal {
        let Some(bar) = usable_bar(position, history) else {
            return ExitSignal::hold();
        };

        if bar.close <= position.hard_stop() {
            return ExitSignal::full(position.hard_stop(), ExitReason::HardStop);
        }

        if let Some(signal) = self.managed_exit(position, bar, history) {
            return signal;
        }

        self.advance(position, bar, history);
        ExitSignal::hold()
    }
}
