//! Price-history pipeline: first-run backfill and incremental daily updates.

use crate::domain::error::SharpefolioError;
use crate::domain::gatherer::{HistoryGatherer, persist};
use crate::domain::settings::PriceHistorySettings;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::storage_port::StoragePort;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Normalised names of tables created during this run.
    pub tables_created: Vec<String>,
    pub backfill_rows: usize,
    pub recent_rows: usize,
}

/// Create a table for every configured ticker and load its full history.
pub fn bootstrap(
    storage: &dyn StoragePort,
    provider: &dyn MarketDataPort,
    settings: &PriceHistorySettings,
) -> Result<RefreshSummary, SharpefolioError> {
    let tickers = settings.ticker_map()?;
    let missing = storage.find_missing_tables(&settings.tickers)?;

    let mut summary = RefreshSummary::default();
    for table in tickers.tables() {
        storage.create_table(table, &settings.columns)?;
        if missing.contains(table) {
            summary.tables_created.push(table.to_string());
        }
    }

    let gatherer = HistoryGatherer::with_map(provider, tickers);
    let histories = gatherer.fetch_range(settings.backfill_period)?;
    summary.backfill_rows = persist(storage, &histories)?;

    info!(
        tickers = gatherer.tickers().len(),
        rows = summary.backfill_rows,
        "price history bootstrap complete"
    );
    Ok(summary)
}

/// Backfill tickers that have no table yet, then refresh the recent window
/// for every configured ticker.
///
/// Tickers backfilled in this run are refreshed again by the recent window.
pub fn run_incremental(
    storage: &dyn StoragePort,
    provider: &dyn MarketDataPort,
    settings: &PriceHistorySettings,
) -> Result<RefreshSummary, SharpefolioError> {
    let tickers = settings.ticker_map()?;
    let missing: Vec<String> = storage
        .find_missing_tables(&settings.tickers)?
        .into_iter()
        .collect();

    let mut summary = RefreshSummary::default();
    if !missing.is_empty() {
        warn!(count = missing.len(), "new tickers found");
        for table in &missing {
            storage.create_table(table, &settings.columns)?;
            info!(table = %table, "created table");
        }
        let backfill = HistoryGatherer::with_map(provider, tickers.restrict_to(&missing));
        let histories = backfill.fetch_range(settings.backfill_period)?;
        summary.backfill_rows = persist(storage, &histories)?;
        summary.tables_created = missing;
    }

    let gatherer = HistoryGatherer::with_map(provider, tickers);
    let histories = gatherer.fetch_range(settings.recent_period)?;
    summary.recent_rows = persist(storage, &histories)?;

    info!(
        created = summary.tables_created.len(),
        backfill_rows = summary.backfill_rows,
        recent_rows = summary.recent_rows,
        "price history update complete"
    );
    Ok(summary)
}
