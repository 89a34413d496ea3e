//! Market-data provider port trait.

use crate::domain::error::SharpefolioError;
use crate::domain::period::LookbackPeriod;
use crate::domain::price::HistoryFrame;

pub trait MarketDataPort {
    /// Daily history for `symbol` covering `period`, oldest row first.
    fn fetch_history(
        &self,
        symbol: &str,
        period: LookbackPeriod,
    ) -> Result<HistoryFrame, SharpefolioError>;
}
