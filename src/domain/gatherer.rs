//! History gatherer: pulls price series from a market-data provider and
//! writes them into per-ticker tables.

use crate::domain::error::SharpefolioError;
use crate::domain::period::{LookbackPeriod, RECENT_WINDOW};
use crate::domain::price::{HistoryFrame, PriceRecord, clean_header};
use crate::domain::ticker::TickerMap;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::storage_port::StoragePort;
use tracing::{debug, info};

/// Normalised price rows for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerHistory {
    pub symbol: String,
    pub table: String,
    pub records: Vec<PriceRecord>,
}

pub struct HistoryGatherer<'a> {
    provider: &'a dyn MarketDataPort,
    tickers: TickerMap,
}

impl<'a> HistoryGatherer<'a> {
    pub fn new<S: AsRef<str>>(
        provider: &'a dyn MarketDataPort,
        symbols: &[S],
    ) -> Result<Self, SharpefolioError> {
        Ok(Self {
            provider,
            tickers: TickerMap::new(symbols)?,
        })
    }

    pub fn with_map(provider: &'a dyn MarketDataPort, tickers: TickerMap) -> Self {
        Self { provider, tickers }
    }

    pub fn tickers(&self) -> &TickerMap {
        &self.tickers
    }

    /// Fetch every ticker over `period`. The first provider failure aborts
    /// the batch.
    pub fn fetch_range(&self, period: LookbackPeriod) -> Result<Vec<TickerHistory>, SharpefolioError> {
        let mut histories = Vec::with_capacity(self.tickers.len());
        for (symbol, table) in self.tickers.iter() {
            let frame = self.provider.fetch_history(symbol, period)?;
            let records = frame_to_records(symbol, &frame)?;
            debug!(symbol, period = %period, rows = records.len(), "fetched history");
            histories.push(TickerHistory {
                symbol: symbol.to_string(),
                table: table.to_string(),
                records,
            });
        }
        Ok(histories)
    }

    pub fn fetch_last_few_days(&self) -> Result<Vec<TickerHistory>, SharpefolioError> {
        self.fetch_range(RECENT_WINDOW)
    }
}

/// Delete-then-append each ticker's rows. Returns the total rows written.
pub fn persist(
    storage: &dyn StoragePort,
    histories: &[TickerHistory],
) -> Result<usize, SharpefolioError> {
    let mut written = 0;
    for history in histories {
        let n = storage.replace_prices(&history.table, &history.records)?;
        info!(table = %history.table, rows = n, "stored price rows");
        written += n;
    }
    Ok(written)
}

/// Map a provider frame onto price records by cleaned column name.
///
/// `open`, `high`, `low` and `close` are required columns and rows missing
/// any of them are dropped. `volume`, `dividends` and `stock_splits` default
/// to zero. Timestamps are reduced to their calendar day; a later row for the
/// same day replaces an earlier one.
pub fn frame_to_records(
    symbol: &str,
    frame: &HistoryFrame,
) -> Result<Vec<PriceRecord>, SharpefolioError> {
    let headers: Vec<String> = frame.columns.iter().map(|c| clean_header(c)).collect();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let required = |name: &str| {
        position(name).ok_or_else(|| SharpefolioError::Provider {
            symbol: symbol.to_string(),
            reason: format!("missing column {name}"),
        })
    };

    let open = required("open")?;
    let high = required("high")?;
    let low = required("low")?;
    let close = required("close")?;
    let volume = position("volume");
    let dividends = position("dividends");
    let splits = position("stock_splits");

    let value = |row: &[Option<f64>], idx: usize| row.get(idx).copied().flatten();
    let optional = |row: &[Option<f64>], idx: Option<usize>| {
        idx.and_then(|i| value(row, i)).unwrap_or(0.0)
    };

    let mut records: Vec<PriceRecord> = Vec::with_capacity(frame.rows.len());
    for row in &frame.rows {
        let values = row.values.as_slice();
        let (Some(o), Some(h), Some(l), Some(c)) = (
            value(values, open),
            value(values, high),
            value(values, low),
            value(values, close),
        ) else {
            continue;
        };

        let record = PriceRecord {
            date: row.timestamp.date(),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: optional(values, volume).round() as i64,
            dividends: optional(values, dividends),
            stock_splits: optional(values, splits),
        };

        match records.last_mut() {
            Some(last) if last.date == record.date => *last = record,
            _ => records.push(record),
        }
    }

    Ok(records)
}
