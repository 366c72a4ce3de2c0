//! Valid-price resolution with a bounded backward search.

use chrono::NaiveDate;

use super::error::BacktestError;
use crate::data::HistoryView;
use crate::domain::is_valid_price;

/// A close usable for marking or filling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPrice {
    /// Date of the bar the price came from.
    pub date: NaiveDate,
    pub price: f64,
    /// True when the price is not today's close.
    pub fallback: bool,
}

/// Most recent valid close for `symbol` on or before the view's as-of date.
///
/// Looks at today's bar and up to `max_sessions` bars before it. Fails with
/// `InvalidPriceData` when none of them carries a positive, finite close.
pub fn resolve_close(
    view: &HistoryView<'_>,
    symbol: &str,
    max_sessions: usize,
) -> Result<ResolvedPrice, BacktestError> {
    let as_of = view.as_of();
    view.bars(symbol)
        .iter()
        .rev()
        .take(max_sessions + 1)
        .find(|bar| is_valid_price(bar.close))
        .map(|bar| ResolvedPrice {
            date: bar.date,
            price: bar.close,
            fallback: bar.date != as_of,
        })
        .ok_or_else(|| BacktestError::InvalidPriceData {
            symbol: symbol.to_string(),
            date: as_of,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{bars_from_closes, InMemoryHistory};

    fn history(closes: &[f64]) -> (InMemoryHistory, Vec<NaiveDate>) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = bars_from_closes("AAA", start, closes);
        let dates = bars.iter().map(|b| b.date).collect();
        (InMemoryHistory::from_bars(bars).unwrap(), dates)
    }

    #[test]
    fn todays_close_when_valid() {
        let (h, dates) = history(&[10.0, 11.0]);
        let p = resolve_close(&HistoryView::new(&h, dates[1]), "AAA", 3).unwrap();
        assert_eq!(p.price, 11.0);
        assert!(!p.fallback);
    }

    #[test]
    fn falls_back_past_invalid_bars() {
        let (h, dates) = history(&[10.0, 11.0, 0.0, f64::NAN]);
        let p = resolve_close(&HistoryView::new(&h, dates[3]), "AAA", 3).unwrap();
        assert_eq!(p.price, 11.0);
        assert_eq!(p.date, dates[1]);
        assert!(p.fallback);
    }

    #[test]
    fn falls_back_over_missing_day() {
        let (h, dates) = history(&[10.0, 11.0]);
        let later = dates[1] + chrono::Duration::days(1);
        let p = resolve_close(&HistoryView::new(&h, later), "AAA", 3).unwrap();
        assert_eq!(p.price, 11.0);
        assert!(p.fallback);
    }

    #[test]
    fn fails_when_search_is_exhausted() {
        let (h, dates) = history(&[10.0, 0.0, 0.0, 0.0]);
        let err = resolve_close(&HistoryView::new(&h, dates[3]), "AAA", 2).unwrap_err();
        assert_eq!(
            err,
            BacktestError::InvalidPriceData {
                symbol: "AAA".into(),
                date: dates[3]
            }
        );
    }
}
