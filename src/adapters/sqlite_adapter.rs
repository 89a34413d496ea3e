//! SQLite storage adapter for price tables and the model registry.

use crate::domain::error::SharpefolioError;
use crate::domain::model_run::ModelRun;
use crate::domain::price::{DATE_FORMAT, PriceRecord};
use crate::domain::schema::{ColumnSpec, PRICE_FIELDS, quote_ident};
use crate::ports::storage_port::StoragePort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::HashSet;
use std::path::Path;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    /// Open (creating if absent) the database file at `path`. Missing parent
    /// directories are created too.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SharpefolioError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| SharpefolioError::Database {
                reason: format!("{}: {}", path.display(), e),
            })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, SharpefolioError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| SharpefolioError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, SharpefolioError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| SharpefolioError::Database {
                reason: e.to_string(),
            })
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, SharpefolioError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e: chrono::ParseError| {
        SharpefolioError::Database {
            reason: format!("invalid stored date {value:?}: {e}"),
        }
    })
}

fn row_date(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let date_str: String = row.get(idx)?;
    NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl StoragePort for SqliteAdapter {
    fn create_table(&self, name: &str, columns: &[ColumnSpec]) -> Result<(), SharpefolioError> {
        let column_list = columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type))
            .collect::<Vec<_>>()
            .join(", ");

        self.conn()?
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                quote_ident(name),
                column_list
            ))
            .map_err(SharpefolioError::query)
    }

    fn list_tables(&self) -> Result<HashSet<String>, SharpefolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
            .map_err(SharpefolioError::query)?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(SharpefolioError::query)?;

        let mut tables = HashSet::new();
        for row in rows {
            tables.insert(row.map_err(SharpefolioError::query)?);
        }
        Ok(tables)
    }

    fn replace_prices(
        &self,
        table: &str,
        records: &[PriceRecord],
    ) -> Result<usize, SharpefolioError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(SharpefolioError::query)?;
        let table = quote_ident(table);

        {
            let mut delete = tx
                .prepare(&format!("DELETE FROM {table} WHERE date = ?1"))
                .map_err(SharpefolioError::query)?;
            for record in records {
                delete
                    .execute(params![record.date.format(DATE_FORMAT).to_string()])
                    .map_err(SharpefolioError::query)?;
            }

            let mut insert = tx
                .prepare(&format!(
                    "INSERT INTO {table} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    PRICE_FIELDS.join(", ")
                ))
                .map_err(SharpefolioError::query)?;
            for record in records {
                insert
                    .execute(params![
                        record.date.format(DATE_FORMAT).to_string(),
                        record.open,
                        record.high,
                        record.low,
                        record.close,
                        record.volume,
                        record.dividends,
                        record.stock_splits,
                    ])
                    .map_err(SharpefolioError::query)?;
            }
        }

        tx.commit().map_err(SharpefolioError::query)?;
        Ok(records.len())
    }

    fn earliest_date(&self, table: &str) -> Result<Option<NaiveDate>, SharpefolioError> {
        let min: Option<String> = self
            .conn()?
            .query_row(
                &format!("SELECT MIN(date) FROM {}", quote_ident(table)),
                [],
                |row| row.get(0),
            )
            .map_err(SharpefolioError::query)?;

        min.as_deref().map(parse_date).transpose()
    }

    fn closes_between(
        &self,
        table: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, SharpefolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT date, close FROM {}
                 WHERE date >= ?1 AND date < ?2 AND close IS NOT NULL
                 ORDER BY date ASC",
                quote_ident(table)
            ))
            .map_err(SharpefolioError::query)?;

        let rows = stmt
            .query_map(
                params![
                    start.format(DATE_FORMAT).to_string(),
                    end.format(DATE_FORMAT).to_string()
                ],
                |row| Ok((row_date(row, 0)?, row.get::<_, f64>(1)?)),
            )
            .map_err(SharpefolioError::query)?;

        let mut closes = Vec::new();
        for row in rows {
            closes.push(row.map_err(SharpefolioError::query)?);
        }
        Ok(closes)
    }

    fn price_range(
        &self,
        table: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SharpefolioError> {
        let result: (Option<String>, Option<String>, i64) = self
            .conn()?
            .query_row(
                &format!("SELECT MIN(date), MAX(date), COUNT(*) FROM {}", quote_ident(table)),
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(SharpefolioError::query)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => Ok(Some((
                parse_date(&min_str)?,
                parse_date(&max_str)?,
                count as usize,
            ))),
            _ => Ok(None),
        }
    }

    fn max_model_id(&self, table: &str) -> Result<Option<i64>, SharpefolioError> {
        self.conn()?
            .query_row(
                &format!("SELECT MAX(model_id) FROM {}", quote_ident(table)),
                [],
                |row| row.get(0),
            )
            .map_err(SharpefolioError::query)
    }

    fn insert_model_run(&self, table: &str, run: &ModelRun) -> Result<(), SharpefolioError> {
        self.conn()?
            .execute(
                &format!(
                    "INSERT INTO {} VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    quote_ident(table)
                ),
                params![
                    run.model_id,
                    run.date.format(DATE_FORMAT).to_string(),
                    run.position_count as i64,
                    run.expected_return_pct,
                    run.volatility_pct,
                    run.sharpe_ratio,
                    run.leftover_cash,
                    run.weights_file_path,
                    run.allocation_file_path,
                ],
            )
            .map_err(SharpefolioError::query)?;
        Ok(())
    }

    fn latest_model_run(&self, table: &str) -> Result<Option<ModelRun>, SharpefolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT * FROM {} ORDER BY model_id DESC LIMIT 1",
                quote_ident(table)
            ))
            .map_err(SharpefolioError::query)?;

        let mut rows = stmt
            .query_map([], |row| {
                Ok(ModelRun {
                    model_id: row.get(0)?,
                    date: row_date(row, 1)?,
                    position_count: row.get::<_, i64>(2)? as usize,
                    expected_return_pct: row.get(3)?,
                    volatility_pct: row.get(4)?,
                    sharpe_ratio: row.get(5)?,
                    leftover_cash: row.get(6)?,
                    weights_file_path: row.get(7)?,
                    allocation_file_path: row.get(8)?,
                })
            })
            .map_err(SharpefolioError::query)?;

        rows.next().transpose().map_err(SharpefolioError::query)
    }
}
