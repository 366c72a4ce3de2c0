//! Highest close over the prior N sessions.
//!
//! HC[t] = max(close[t-period .. t-1]). The current bar is excluded, so
//! `close[t] > HC[t]` reads as "closed above the prior range".
//! Lookback: period.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct HighestClose {
    period: usize,
    name: String,
}

impl HighestClose {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "HighestClose period must be >= 1");
        Self {
            period,
            name: format!("highest_close_{period}"),
        }
    }
}

fn window_max(window: &[Bar]) -> f64 {
    if window.iter().any(|b| b.close.is_nan()) {
        return f64::NAN;
    }
    window
        .iter()
        .map(|b| b.close)
        .fold(f64::NEG_INFINITY, f64::max)
}

impl Indicator for HighestClose {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = vec![f64::NAN; bars.len()];
        for i in self.period..bars.len() {
            result[i] = window_max(&bars[i - self.period..i]);
        }
        result
    }

    fn latest(&self, bars: &[Bar]) -> Option<f64> {
        let n = bars.len();
        if n <= self.period {
            return None;
        }
        let value = window_max(&bars[n - 1 - self.period..n - 1]);
        value.is_finite().then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn excludes_current_bar() {
        let bars = make_bars(&[10.0, 12.0, 11.0, 20.0]);
        let result = HighestClose::new(3).compute(&bars);
        assert!(result[2].is_nan());
        // Prior three closes: 10, 12, 11
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn latest_agrees_with_series() {
        let bars = make_bars(&[10.0, 14.0, 11.0, 13.0, 12.0, 9.0]);
        let hc = HighestClose::new(2);
        let full = hc.compute(&bars);
        assert_approx(hc.latest(&bars).unwrap(), *full.last().unwrap(), DEFAULT_EPSILON);
        assert!(hc.latest(&bars[..2]).is_none());
    }
}
