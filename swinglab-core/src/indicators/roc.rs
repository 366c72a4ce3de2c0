//! Rate of Change (ROC) as a fraction.
//!
//! ROC[t] = close[t] / close[t-period] - 1
//! Lookback: period.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
    name: String,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self {
            period,
            name: format!("roc_{period}"),
        }
    }
}

fn rate(prev: f64, curr: f64) -> f64 {
    if prev.is_nan() || curr.is_nan() || prev <= 0.0 {
        f64::NAN
    } else {
        curr / prev - 1.0
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = vec![f64::NAN; bars.len()];
        for i in self.period..bars.len() {
            result[i] = rate(bars[i - self.period].close, bars[i].close);
        }
        result
    }

    fn latest(&self, bars: &[Bar]) -> Option<f64> {
        let n = bars.len();
        if n <= self.period {
            return None;
        }
        let value = rate(bars[n - 1 - self.period].close, bars[n - 1].close);
        value.is_finite().then_some(value)
    }
}
