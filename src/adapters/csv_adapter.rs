//! CSV file market-data adapter.
//!
//! Reads `<dir>/<symbol>.csv`. The first column is the date (`%Y-%m-%d`, or a
//! `%Y-%m-%d %H:%M:%S` timestamp); every other column is passed through under
//! its header. Blank cells become missing values.

use crate::domain::error::SharpefolioError;
use crate::domain::period::LookbackPeriod;
use crate::domain::price::{DATE_FORMAT, HistoryFrame};
use crate::ports::market_data_port::MarketDataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl MarketDataPort for CsvAdapter {
    fn fetch_history(
        &self,
        symbol: &str,
        period: LookbackPeriod,
    ) -> Result<HistoryFrame, SharpefolioError> {
        let path = self.csv_path(symbol);
        let provider_err = |reason: String| SharpefolioError::Provider {
            symbol: symbol.to_string(),
            reason,
        };

        let content = fs::read_to_string(&path)
            .map_err(|e| provider_err(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| provider_err(format!("CSV header error: {e}")))?
            .clone();
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| provider_err(format!("CSV parse error: {e}")))?;

            let raw_date = record
                .get(0)
                .ok_or_else(|| provider_err("missing date column".into()))?;
            let timestamp = parse_timestamp(raw_date)
                .ok_or_else(|| provider_err(format!("invalid date {raw_date:?}")))?;

            let mut values = Vec::with_capacity(columns.len());
            for i in 1..=columns.len() {
                let cell = record.get(i).map(str::trim).unwrap_or("");
                if cell.is_empty() {
                    values.push(None);
                } else {
                    let v: f64 = cell.parse().map_err(|e| {
                        provider_err(format!("invalid value {cell:?} in {}: {}", columns[i - 1], e))
                    })?;
                    values.push(Some(v));
                }
            }
            rows.push((timestamp, values));
        }

        rows.sort_by_key(|(ts, _)| *ts);

        let keep_from = match period {
            LookbackPeriod::Max => 0,
            LookbackPeriod::Days(n) => rows.len().saturating_sub(n as usize),
            _ => match rows.last().and_then(|(ts, _)| period.calendar_start(ts.date())) {
                Some(start) => rows.partition_point(|(ts, _)| ts.date() < start),
                None => 0,
            },
        };

        let mut frame = HistoryFrame::new(columns);
        for (timestamp, values) in rows.into_iter().skip(keep_from) {
            frame.push_row(timestamp, values);
        }
        Ok(frame)
    }
}
