//! Provider lookback windows.

use chrono::{Datelike, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookbackPeriod {
    /// A number of trading days.
    Days(u32),
    Months(u32),
    Years(u32),
    YearToDate,
    Max,
}

/// Window used for incremental updates. Several days of overlap cover
/// provider lag and gaps.
pub const RECENT_WINDOW: LookbackPeriod = LookbackPeriod::Days(5);

impl LookbackPeriod {
    /// First calendar date covered by a calendar window that ends on `last`.
    ///
    /// Returns `None` for [`LookbackPeriod::Max`] and for day windows, which
    /// count trading rows rather than calendar days.
    pub fn calendar_start(&self, last: NaiveDate) -> Option<NaiveDate> {
        match *self {
            LookbackPeriod::Days(_) | LookbackPeriod::Max => None,
            LookbackPeriod::Months(n) => last.checked_sub_months(Months::new(n)),
            LookbackPeriod::Years(n) => last.checked_sub_months(Months::new(n * 12)),
            LookbackPeriod::YearToDate => NaiveDate::from_ymd_opt(last.year(), 1, 1),
        }
    }
}

impl fmt::Display for LookbackPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookbackPeriod::Days(n) => write!(f, "{n}d"),
            LookbackPeriod::Months(n) => write!(f, "{n}mo"),
            LookbackPeriod::Years(n) => write!(f, "{n}y"),
            LookbackPeriod::YearToDate => write!(f, "ytd"),
            LookbackPeriod::Max => write!(f, "max"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown lookback period {0:?} (expected one of 1d,5d,1mo,3mo,6mo,1y,2y,5y,10y,ytd,max)")]
pub struct PeriodParseError(pub String);

impl FromStr for LookbackPeriod {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(LookbackPeriod::Days(1)),
            "5d" => Ok(LookbackPeriod::Days(5)),
            "1mo" => Ok(LookbackPeriod::Months(1)),
            "3mo" => Ok(LookbackPeriod::Months(3)),
            "6mo" => Ok(LookbackPeriod::Months(6)),
            "1y" => Ok(LookbackPeriod::Years(1)),
            "2y" => Ok(LookbackPeriod::Years(2)),
            "5y" => Ok(LookbackPeriod::Years(5)),
            "10y" => Ok(LookbackPeriod::Years(10)),
            "ytd" => Ok(LookbackPeriod::YearToDate),
            "max" => Ok(LookbackPeriod::Max),
            _ => Err(PeriodParseError(s.to_string())),
        }
    }
}
