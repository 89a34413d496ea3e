//! Daily price records and the raw provider frame they are built from.

use chrono::{NaiveDate, NaiveDateTime};

/// Storage format for the `date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub dividends: f64,
    pub stock_splits: f64,
}

/// Price series as delivered by a market-data provider: free-form column
/// headers (`"Stock Splits"`), exchange-local timestamps and possibly-missing
/// values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFrame {
    pub columns: Vec<String>,
    pub rows: Vec<HistoryRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub timestamp: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

impl HistoryFrame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, timestamp: NaiveDateTime, values: Vec<Option<f64>>) {
        self.rows.push(HistoryRow { timestamp, values });
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// `"Stock Splits"` -> `"stock_splits"`
pub fn clean_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}
