//! Table column declarations.

use std::fmt;

/// Default schema for a per-ticker price table.
pub const PRICE_TABLE_COLUMNS: &str = "date text, open real, high real, low real, close real, \
     volume integer, dividends integer, stock_splits integer";

/// Default schema for the model registry. Inserts are positional, so the
/// column order here is the order of [`crate::domain::model_run::ModelRun`] fields.
pub const MODEL_REGISTRY_COLUMNS: &str = "model_id integer, date text, position_count integer, \
     expected_return_pct real, volatility_pct real, sharpe_ratio real, leftover_cash real, \
     weights_file_path text, allocation_file_path text";

pub const MODEL_REGISTRY_WIDTH: usize = 9;

/// Price columns written by name on every insert.
pub const PRICE_FIELDS: [&str; 8] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "dividends",
    "stock_splits",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: String,
}

impl ColumnSpec {
    pub fn new(name: &str, sql_type: &str) -> Self {
        Self {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
        }
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.sql_type)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ColumnSpecError {
    #[error("empty column list")]
    Empty,

    #[error("column {0:?} must be `name type`")]
    Malformed(String),

    #[error("invalid column name {0:?}")]
    InvalidName(String),

    #[error("duplicate column {0}")]
    Duplicate(String),
}

/// Parse `name type, name type, ...` into an ordered column list.
///
/// Types may span several words (`integer not null`); names must be plain
/// identifiers.
pub fn parse_columns(input: &str) -> Result<Vec<ColumnSpec>, ColumnSpecError> {
    if input.trim().is_empty() {
        return Err(ColumnSpecError::Empty);
    }

    let mut columns: Vec<ColumnSpec> = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        let (name, sql_type) = part
            .split_once(char::is_whitespace)
            .map(|(n, t)| (n.trim(), t.trim()))
            .filter(|(_, t)| !t.is_empty())
            .ok_or_else(|| ColumnSpecError::Malformed(part.to_string()))?;

        let valid_name = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(ColumnSpecError::InvalidName(name.to_string()));
        }
        if columns.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
            return Err(ColumnSpecError::Duplicate(name.to_string()));
        }
        columns.push(ColumnSpec::new(name, sql_type));
    }

    Ok(columns)
}

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
