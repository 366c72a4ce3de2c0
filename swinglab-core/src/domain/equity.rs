//! Equity curve: total account value at each simulated close.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Account value at one trading day's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    /// Uninvested cash at the close.
    pub cash: f64,
    /// Cash plus open positions marked at the close.
    pub equity: f64,
}

/// Ordered equity points, one per simulated trading day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(days: usize) -> Self {
        Self {
            points: Vec::with_capacity(days),
        }
    }

    /// Append a point. Dates must be strictly increasing.
    pub fn push(&mut self, point: EquityPoint) {
        debug_assert!(
            self.points.last().map_or(true, |last| last.date < point.date),
            "equity curve dates must be strictly increasing"
        );
        self.points.push(point);
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    /// Equity values only, in date order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.equity).collect()
    }

    pub fn last(&self) -> Option<&EquityPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<EquityPoint> for EquityCurve {
    fn from_iter<I: IntoIterator<Item = EquityPoint>>(iter: I) -> Self {
        let mut curve = EquityCurve::new();
        for point in iter {
            curve.push(point);
        }
        curve
    }
}
