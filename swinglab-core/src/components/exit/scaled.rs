//! Scaled swing exit: fixed profit tiers ahead of the swing rules.
//!
//! Each tier sells a fraction of the *original* share count the first time
//! the close reaches its gain. The fraction is converted to a fraction of the
//! current shares when it fires. A tier too small to sell a whole share stays
//! armed instead of firing. The hard stop still comes first, and the swing
//! rules manage whatever remains.

use chrono::NaiveDate;
use tracing::debug;

use super::swing::{usable_bar, SwingExit};
use super::ExitStrategy;
use crate::data::HistoryView;
use crate::domain::{ExitReason, ExitSignal, Position};
use crate::engine::shares_to_close;

/// State namespace and registry name.
pub const NAMESPACE: &str = "scaled_swing";

/// Sell `fraction` of the original shares once the close is `gain` above entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitTier {
    pub gain: f64,
    pub fraction: f64,
}

impl ProfitTier {
    pub fn new(gain: f64, fraction: f64) -> Self {
        Self { gain, fraction }
    }
}

#[derive(Debug, Clone)]
pub struct ScaledSwingExit {
    tiers: Vec<ProfitTier>,
    inner: SwingExit,
}

impl ScaledSwingExit {
    /// Tiers must have ascending gains and fractions in (0, 1] summing to at most 1.
    pub fn new(tiers: Vec<ProfitTier>, inner: SwingExit) -> Self {
        assert!(
            tiers.windows(2).all(|w| w[0].gain < w[1].gain),
            "tier gains must be strictly ascending"
        );
        assert!(
            tiers.iter().all(|t| t.fraction > 0.0 && t.fraction <= 1.0),
            "tier fractions must be in (0, 1]"
        );
        assert!(
            tiers.iter().map(|t| t.fraction).sum::<f64>() <= 1.0 + 1e-9,
            "tier fractions must sum to at most 1"
        );
        Self { tiers, inner }
    }

    pub fn default_params() -> Self {
        Self::new(
            vec![
                ProfitTier::new(0.08, 0.25),
                ProfitTier::new(0.15, 0.25),
                ProfitTier::new(0.25, 0.25),
            ],
            SwingExit::default_params(),
        )
    }

    pub fn tiers(&self) -> &[ProfitTier] {
        &self.tiers
    }

    fn tier_key(index: usize) -> String {
        format!("tier_{index}_fired")
    }

    /// Fraction of the current shares that sells `tiers[index]` of the original.
    ///
    /// When the tiers add up to the whole position, the last one closes the
    /// true remainder so rounding never strands a share.
    fn fraction_of_current(&self, position: &Position, index: usize) -> f64 {
        let current = position.shares();
        if current == 0 {
            return 1.0;
        }
        let is_last = index + 1 == self.tiers.len();
        let total: f64 = self.tiers.iter().map(|t| t.fraction).sum();
        if is_last && total >= 1.0 - 1e-9 {
            return 1.0;
        }
        let tier = self.tiers[index];
        (tier.fraction * position.initial_shares() as f64 / current as f64).min(1.0)
    }
}

impl ExitStrategy for ScaledSwingExit {
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

        let gain = position.unrealized_return(bar.close);
        for (index, tier) in self.tiers.iter().enumerate() {
            let key = Self::tier_key(index);
            if position.state.flag(NAMESPACE, &key) {
                continue;
            }
            if gain < tier.gain {
                break;
            }
            let fraction = self.fraction_of_current(position, index);
            if shares_to_close(position.shares(), fraction) == 0 {
                debug!(
                    symbol = position.symbol(),
                    date = %bar.date,
                    tier = index,
                    held = position.shares(),
                    "profit tier rounds to zero shares"
                );
                continue;
            }
            position.state.scope(NAMESPACE).set_flag(&key, true);
            debug!(
                symbol = position.symbol(),
                date = %bar.date,
                tier = index,
                gain,
                fraction,
                "profit tier reached"
            );
            self.inner.advance(position, bar, history);
            return ExitSignal::partial(fraction, bar.close, ExitReason::ProfitTarget);
        }

        if let Some(signal) = self.inner.managed_exit(position, bar, history) {
            return signal;
        }

        self.inner.advance(position, bar, history);
        ExitSignal::hold()
    }
}
