//! Relational storage port trait.
//!
//! One implementation serves both the price-history store (one table per
//! normalised ticker) and the model registry.

use crate::domain::error::SharpefolioError;
use crate::domain::model_run::ModelRun;
use crate::domain::price::PriceRecord;
use crate::domain::schema::ColumnSpec;
use crate::domain::ticker::normalize_ticker;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};

pub trait StoragePort {
    /// Create `name` with `columns` unless it already exists.
    fn create_table(&self, name: &str, columns: &[ColumnSpec]) -> Result<(), SharpefolioError>;

    fn list_tables(&self) -> Result<HashSet<String>, SharpefolioError>;

    /// Normalised names of `tickers` that have no table yet. Table names
    /// compare ignoring ASCII case, as SQLite identifiers do.
    fn find_missing_tables(
        &self,
        tickers: &[String],
    ) -> Result<BTreeSet<String>, SharpefolioError> {
        let existing: HashSet<String> = self
            .list_tables()?
            .iter()
            .map(|t| t.to_ascii_lowercase())
            .collect();
        Ok(tickers
            .iter()
            .map(|t| normalize_ticker(t))
            .filter(|t| !existing.contains(&t.to_ascii_lowercase()))
            .collect())
    }

    /// Delete stored rows whose date appears in `records`, then append
    /// `records`. Returns the number of rows written.
    fn replace_prices(&self, table: &str, records: &[PriceRecord])
        -> Result<usize, SharpefolioError>;

    fn earliest_date(&self, table: &str) -> Result<Option<NaiveDate>, SharpefolioError>;

    /// `(date, close)` pairs with `start <= date < end`, ascending by date.
    fn closes_between(
        &self,
        table: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, SharpefolioError>;

    /// First date, last date and row count, or `None` for an empty table.
    fn price_range(
        &self,
        table: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SharpefolioError>;

    fn max_model_id(&self, table: &str) -> Result<Option<i64>, SharpefolioError>;

    fn insert_model_run(&self, table: &str, run: &ModelRun) -> Result<(), SharpefolioError>;

    fn latest_model_run(&self, table: &str) -> Result<Option<ModelRun>, SharpefolioError>;
}
