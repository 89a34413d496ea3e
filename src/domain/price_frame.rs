//! Wide close-price frame: one row per date, one column per ticker.

use crate::domain::error::SharpefolioError;
use chrono::NaiveDate;
use nalgebra::DMatrix;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceFrame {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    /// `dates.len()` x `tickers.len()`
    pub closes: DMatrix<f64>,
}

impl PriceFrame {
    /// Inner-join per-ticker close series on date. Only dates present in every
    /// series survive; the result is sorted ascending by date.
    pub fn inner_join(series: Vec<(String, Vec<(NaiveDate, f64)>)>) -> Result<Self, SharpefolioError> {
        if series.is_empty() {
            return Err(SharpefolioError::InsufficientData {
                reason: "no tickers to join".into(),
            });
        }

        let tickers: Vec<String> = series.iter().map(|(t, _)| t.clone()).collect();
        let lookups: Vec<BTreeMap<NaiveDate, f64>> = series
            .into_iter()
            .map(|(_, rows)| rows.into_iter().collect())
            .collect();

        let dates: Vec<NaiveDate> = lookups[0]
            .keys()
            .filter(|d| lookups[1..].iter().all(|l| l.contains_key(d)))
            .copied()
            .collect();

        let closes = DMatrix::from_fn(dates.len(), tickers.len(), |r, c| lookups[c][&dates[r]]);

        Ok(Self {
            dates,
            tickers,
            closes,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Close prices on the most recent date, keyed by ticker.
    pub fn latest_prices(&self) -> Vec<(String, f64)> {
        match self.dates.len() {
            0 => Vec::new(),
            n => self
                .tickers
                .iter()
                .enumerate()
                .map(|(c, t)| (t.clone(), self.closes[(n - 1, c)]))
                .collect(),
        }
    }

    /// Simple daily returns, `(rows - 1)` x `tickers`.
    pub fn daily_returns(&self) -> DMatrix<f64> {
        let rows = self.dates.len().saturating_sub(1);
        DMatrix::from_fn(rows, self.tickers.len(), |r, c| {
            self.closes[(r + 1, c)] / self.closes[(r, c)] - 1.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn inner_join_keeps_common_dates_only() {
        let frame = PriceFrame::inner_join(vec![
            ("voo".into(), vec![(d(2), 10.0), (d(3), 11.0), (d(4), 12.0)]),
            ("aapl".into(), vec![(d(3), 20.0), (d(4), 21.0), (d(5), 22.0)]),
        ])
        .unwrap();

        assert_eq!(frame.dates, vec![d(3), d(4)]);
        assert_eq!(frame.tickers, vec!["voo", "aapl"]);
        assert_eq!(frame.closes[(0, 0)], 11.0);
        assert_eq!(frame.closes[(1, 1)], 21.0);
    }

    #[test]
    fn inner_join_sorts_unordered_input() {
        let frame = PriceFrame::inner_join(vec![(
            "voo".into(),
            vec![(d(4), 12.0), (d(2), 10.0), (d(3), 11.0)],
        )])
        .unwrap();
        assert_eq!(frame.first_date(), Some(d(2)));
        assert_eq!(frame.last_date(), Some(d(4)));
        assert_eq!(frame.closes[(2, 0)], 12.0);
    }

    #[test]
    fn inner_join_disjoint_series_is_empty() {
        let frame = PriceFrame::inner_join(vec![
            ("voo".into(), vec![(d(2), 10.0)]),
            ("aapl".into(), vec![(d(3), 20.0)]),
        ])
        .unwrap();
        assert!(frame.is_empty());
        assert!(frame.latest_prices().is_empty());
    }

    #[test]
    fn inner_join_requires_series() {
        assert!(PriceFrame::inner_join(Vec::new()).is_err());
    }

    #[test]
    fn latest_prices_and_returns() {
        let frame = PriceFrame::inner_join(vec![
            ("voo".into(), vec![(d(2), 100.0), (d(3), 110.0)]),
            ("aapl".into(), vec![(d(2), 50.0), (d(3), 45.0)]),
        ])
        .unwrap();

        assert_eq!(
            frame.latest_prices(),
            vec![("voo".to_string(), 110.0), ("aapl".to_string(), 45.0)]
        );

        let returns = frame.daily_returns();
        assert_eq!(returns.nrows(), 1);
        assert_relative_eq!(returns[(0, 0)], 0.1, epsilon = 1e-12);
        assert_relative_eq!(returns[(0, 1)], -0.1, epsilon = 1e-12);
    }
}
