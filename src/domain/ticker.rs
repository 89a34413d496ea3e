//! Ticker symbols and their storage-safe table names.
//!
//! Symbols such as `btc-usd` cannot be used verbatim as SQL identifiers, so
//! every symbol maps to a normalised name (`btc_usd`) that names its price
//! table. The mapping is fixed: the same symbol always produces the same name.

use crate::domain::error::SharpefolioError;
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TickerListError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

/// Replace characters that are illegal in a table identifier.
pub fn normalize_ticker(symbol: &str) -> String {
    symbol.replace('-', "_")
}

/// Parse a comma-separated ticker list, preserving order.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, TickerListError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(TickerListError::EmptyToken);
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(TickerListError::DuplicateTicker(trimmed.to_string()));
        }
        tickers.push(trimmed.to_string());
    }

    Ok(tickers)
}

/// Ordered symbol to table-name mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerMap {
    entries: Vec<(String, String)>,
}

impl TickerMap {
    /// Fails when two distinct symbols normalise to the same table name.
    /// SQLite identifiers ignore ASCII case, so `VOO` and `voo` collide.
    pub fn new<S: AsRef<str>>(symbols: &[S]) -> Result<Self, SharpefolioError> {
        let mut entries: Vec<(String, String)> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.as_ref();
            let table = normalize_ticker(symbol);
            match entries.iter().find(|(_, t)| t.eq_ignore_ascii_case(&table)) {
                Some((existing, _)) if existing == symbol => continue,
                Some((existing, _)) => {
                    return Err(SharpefolioError::TickerCollision {
                        first: existing.clone(),
                        second: symbol.to_string(),
                        table,
                    });
                }
                None => entries.push((symbol.to_string(), table)),
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(s, _)| s.as_str())
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, t)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    pub fn table_for(&self, symbol: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, t)| t.as_str())
    }

    pub fn symbol_for(&self, table: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, t)| t == table)
            .map(|(s, _)| s.as_str())
    }

    /// Sub-map restricted to the given table names, keeping this map's order.
    pub fn restrict_to<S: AsRef<str>>(&self, tables: &[S]) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(_, t)| tables.iter().any(|wanted| wanted.as_ref() == t))
            .cloned()
            .collect();
        Self { entries }
    }
}
