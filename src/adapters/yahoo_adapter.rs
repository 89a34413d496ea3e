//! Yahoo Finance provider backed by the `yahoo_finance_api` blocking client.

use crate::domain::error::SharpefolioError;
use crate::domain::period::LookbackPeriod;
use crate::domain::price::HistoryFrame;
use crate::ports::market_data_port::MarketDataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use yahoo_finance_api as yahoo;

pub const HEADERS: [&str; 7] = [
    "Open",
    "High",
    "Low",
    "Close",
    "Volume",
    "Dividends",
    "Stock Splits",
];

pub struct YahooAdapter {
    connector: yahoo::YahooConnector,
}

impl YahooAdapter {
    pub fn new(timeout_secs: u64) -> Result<Self, SharpefolioError> {
        let connector = yahoo::YahooConnector::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SharpefolioError::ConfigInvalid {
                section: "provider".into(),
                key: "kind".into(),
                reason: format!("failed to build Yahoo connector: {e}"),
            })?;
        Ok(Self { connector })
    }
}

/// One daily quote in epoch seconds, as the connector reports it.
#[derive(Debug, Clone, Copy)]
struct DailyBar {
    epoch: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

fn exchange_local(epoch: i64, gmtoffset: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(epoch + gmtoffset, 0).map(|dt| dt.naive_utc())
}

/// Lay quotes out under yfinance-style headers with exchange-local
/// timestamps. Dividends and splits are joined onto the bar of the same
/// exchange-local day; days without an event carry 0.
fn build_frame(
    symbol: &str,
    bars: &[DailyBar],
    dividends: &[(i64, f64)],
    splits: &[(i64, f64)],
    gmtoffset: i64,
) -> Result<HistoryFrame, SharpefolioError> {
    let by_day = |events: &[(i64, f64)]| -> HashMap<NaiveDate, f64> {
        events
            .iter()
            .filter_map(|(epoch, value)| {
                exchange_local(*epoch, gmtoffset).map(|ts| (ts.date(), *value))
            })
            .collect()
    };
    let dividends = by_day(dividends);
    let splits = by_day(splits);

    let mut frame = HistoryFrame::new(HEADERS.iter().map(|h| h.to_string()).collect());
    for bar in bars {
        let timestamp =
            exchange_local(bar.epoch, gmtoffset).ok_or_else(|| SharpefolioError::Provider {
                symbol: symbol.to_string(),
                reason: format!("timestamp out of range: {}", bar.epoch),
            })?;
        let day = timestamp.date();
        frame.push_row(
            timestamp,
            vec![
                Some(bar.open),
                Some(bar.high),
                Some(bar.low),
                Some(bar.close),
                Some(bar.volume),
                Some(dividends.get(&day).copied().unwrap_or(0.0)),
                Some(splits.get(&day).copied().unwrap_or(0.0)),
            ],
        );
    }
    Ok(frame)
}

impl MarketDataPort for YahooAdapter {
    fn fetch_history(
        &self,
        symbol: &str,
        period: LookbackPeriod,
    ) -> Result<HistoryFrame, SharpefolioError> {
        let provider_err = |e: yahoo::YahooError| SharpefolioError::Provider {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        };

        let range = period.to_string();
        debug!(symbol, %range, "requesting quote range");
        let response = self
            .connector
            .get_quote_range(symbol, "1d", &range)
            .map_err(provider_err)?;

        let gmtoffset = response.metadata().map_err(provider_err)?.gmtoffset as i64;
        let bars: Vec<DailyBar> = response
            .quotes()
            .map_err(provider_err)?
            .iter()
            .map(|q| DailyBar {
                epoch: q.timestamp as i64,
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume as f64,
            })
            .collect();
        let dividends: Vec<(i64, f64)> = response
            .dividends()
            .map_err(provider_err)?
            .iter()
            .map(|d| (d.date as i64, d.amount))
            .collect();
        let splits: Vec<(i64, f64)> = response
            .splits()
            .map_err(provider_err)?
            .iter()
            .filter(|s| s.denominator as f64 != 0.0)
            .map(|s| (s.date as i64, s.numerator as f64 / s.denominator as f64))
            .collect();

        build_frame(symbol, &bars, &dividends, &splits, gmtoffset)
    }
}
