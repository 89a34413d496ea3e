#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use nalgebra::{DMatrix, DVector};
use sharpefolio::adapters::mean_variance::MeanVarianceOptimizer;
use sharpefolio::domain::error::SharpefolioError;
use sharpefolio::domain::model_run::ModelKind;
use sharpefolio::domain::optimization::Performance;
use sharpefolio::domain::period::LookbackPeriod;
use sharpefolio::domain::price::{HistoryFrame, PriceRecord};
use sharpefolio::domain::price_frame::PriceFrame;
use sharpefolio::domain::schema::{
    ColumnSpec, MODEL_REGISTRY_COLUMNS, PRICE_TABLE_COLUMNS, parse_columns,
};
use sharpefolio::domain::settings::{ModelSettings, PriceHistorySettings};
use sharpefolio::ports::market_data_port::MarketDataPort;
use sharpefolio::ports::optimizer_port::PortfolioOptimizer;
use sharpefolio::ports::storage_port::StoragePort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

pub const HEADERS: [&str; 7] = [
    "Open",
    "High",
    "Low",
    "Close",
    "Volume",
    "Dividends",
    "Stock Splits",
];

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Closes with steady drift and a wobble at `freq` radians per day. Series
/// with different frequencies have linearly independent returns.
pub fn wavy_closes(base: f64, drift: f64, freq: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let i = i as f64;
            base * (1.0 + drift).powf(i) * (1.0 + 0.01 * (i * freq).sin())
        })
        .collect()
}

/// One close per consecutive calendar day starting at `start`.
pub fn daily_series(start: NaiveDate, closes: &[f64]) -> Vec<(NaiveDate, f64)> {
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| (start + Duration::days(i as i64), *c))
        .collect()
}

pub fn make_record(date: NaiveDate, close: f64) -> PriceRecord {
    PriceRecord {
        date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000,
        dividends: 0.0,
        stock_splits: 0.0,
    }
}

pub fn price_columns() -> Vec<ColumnSpec> {
    parse_columns(PRICE_TABLE_COLUMNS).unwrap()
}

pub fn registry_columns() -> Vec<ColumnSpec> {
    parse_columns(MODEL_REGISTRY_COLUMNS).unwrap()
}

/// Create `table` and store `series` in it.
pub fn seed_prices(storage: &dyn StoragePort, table: &str, series: &[(NaiveDate, f64)]) {
    storage.create_table(table, &price_columns()).unwrap();
    let records: Vec<PriceRecord> = series.iter().map(|(d, c)| make_record(*d, *c)).collect();
    storage.replace_prices(table, &records).unwrap();
}

pub fn row_count(storage: &dyn StoragePort, table: &str) -> usize {
    storage
        .price_range(table)
        .unwrap()
        .map(|(_, _, n)| n)
        .unwrap_or(0)
}

pub fn price_settings(db_path: &str, tickers: &[&str]) -> PriceHistorySettings {
    PriceHistorySettings {
        db_path: db_path.to_string(),
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        columns: price_columns(),
        backfill_period: LookbackPeriod::Max,
        recent_period: LookbackPeriod::Days(5),
    }
}

pub fn model_settings(db_path: &str, artifact_dir: &Path) -> ModelSettings {
    ModelSettings {
        name: "max_sharpe".into(),
        kind: Some(ModelKind::MaxSharpe),
        db_path: db_path.to_string(),
        columns: registry_columns(),
        artifact_dir: artifact_dir.to_path_buf(),
        portfolio_value: 10_000.0,
        risk_free_rate: 0.02,
    }
}

/// In-memory provider serving canned daily closes per symbol. Day windows
/// return the trailing rows; every other window returns the full series.
pub struct MockMarketData {
    pub data: HashMap<String, Vec<(NaiveDate, f64)>>,
    pub errors: HashMap<String, String>,
    pub calls: RefCell<Vec<(String, LookbackPeriod)>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_series(mut self, symbol: &str, series: Vec<(NaiveDate, f64)>) -> Self {
        self.data.insert(symbol.to_string(), series);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn set_series(&mut self, symbol: &str, series: Vec<(NaiveDate, f64)>) {
        self.data.insert(symbol.to_string(), series);
    }

    pub fn calls_for(&self, symbol: &str) -> Vec<LookbackPeriod> {
        self.calls
            .borrow()
            .iter()
            .filter(|(s, _)| s == symbol)
            .map(|(_, p)| *p)
            .collect()
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch_history(
        &self,
        symbol: &str,
        period: LookbackPeriod,
    ) -> Result<HistoryFrame, SharpefolioError> {
        self.calls.borrow_mut().push((symbol.to_string(), period));
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SharpefolioError::Provider {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }

        let series = self.data.get(symbol).cloned().unwrap_or_default();
        let keep_from = match period {
            LookbackPeriod::Days(n) => series.len().saturating_sub(n as usize),
            _ => 0,
        };

        let mut frame = HistoryFrame::new(HEADERS.iter().map(|h| h.to_string()).collect());
        for (d, close) in &series[keep_from..] {
            frame.push_row(
                d.and_hms_opt(9, 30, 0).unwrap(),
                vec![
                    Some(*close),
                    Some(*close),
                    Some(*close),
                    Some(*close),
                    Some(1_000.0),
                    Some(0.0),
                    Some(0.0),
                ],
            );
        }
        Ok(frame)
    }
}

/// Delegates estimation to the real optimizer but returns a weight vector
/// with a short leg.
pub struct ShortingOptimizer {
    pub inner: MeanVarianceOptimizer,
}

impl PortfolioOptimizer for ShortingOptimizer {
    fn expected_returns(&self, frame: &PriceFrame) -> Result<DVector<f64>, SharpefolioError> {
        self.inner.expected_returns(frame)
    }

    fn sample_covariance(&self, frame: &PriceFrame) -> Result<DMatrix<f64>, SharpefolioError> {
        self.inner.sample_covariance(frame)
    }

    fn max_sharpe(
        &self,
        expected_returns: &DVector<f64>,
        _covariance: &DMatrix<f64>,
    ) -> Result<DVector<f64>, SharpefolioError> {
        let n = expected_returns.len();
        let mut w = DVector::from_element(n, 0.0);
        w[0] = 1.25;
        if n > 1 {
            w[n - 1] -= 0.25;
        }
        Ok(w)
    }

    fn portfolio_performance(
        &self,
        weights: &DVector<f64>,
        expected_returns: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Performance {
        self.inner
            .portfolio_performance(weights, expected_returns, covariance)
    }
}
