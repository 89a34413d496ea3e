//! Domain error types.

/// Top-level error type for sharpefolio.
#[derive(Debug, thiserror::Error)]
pub enum SharpefolioError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("tickers {first} and {second} both normalise to table {table}")]
    TickerCollision {
        first: String,
        second: String,
        table: String,
    },

    #[error("market data error for {symbol}: {reason}")]
    Provider { symbol: String, reason: String },

    #[error("no stored price history for {ticker}")]
    NoPriceHistory { ticker: String },

    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("optimization failed: {reason}")]
    Optimization { reason: String },

    /// The optimiser produced a weight below zero. Only long positions are allowed.
    #[error("infeasible allocation: negative weight {weight} detected for {ticker}")]
    ShortPosition { ticker: String, weight: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SharpefolioError {
    pub(crate) fn query(e: rusqlite::Error) -> Self {
        SharpefolioError::DatabaseQuery {
            reason: e.to_string(),
        }
    }

    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SharpefolioError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl SharpefolioError {
    /// Process exit status reported for this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            SharpefolioError::Io(_) | SharpefolioError::Json(_) => 1,
            SharpefolioError::ConfigParse { .. }
            | SharpefolioError::ConfigMissing { .. }
            | SharpefolioError::ConfigInvalid { .. }
            | SharpefolioError::TickerCollision { .. } => 2,
            SharpefolioError::Database { .. } | SharpefolioError::DatabaseQuery { .. } => 3,
            SharpefolioError::Provider { .. } => 4,
            SharpefolioError::NoPriceHistory { .. } | SharpefolioError::InsufficientData { .. } => 5,
            SharpefolioError::Optimization { .. } => 6,
            SharpefolioError::ShortPosition { .. } => 7,
        }
    }
}

impl From<&SharpefolioError> for std::process::ExitCode {
    fn from(err: &SharpefolioError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_position_message_names_ticker() {
        let err = SharpefolioError::ShortPosition {
            ticker: "btc_usd".into(),
            weight: -0.25,
        };
        assert_eq!(
            err.to_string(),
            "infeasible allocation: negative weight -0.25 detected for btc_usd"
        );
    }

    #[test]
    fn short_position_is_distinct_from_optimizer_failure() {
        let short = SharpefolioError::ShortPosition {
            ticker: "voo".into(),
            weight: -0.1,
        };
        let failed = SharpefolioError::Optimization {
            reason: "singular".into(),
        };
        assert_eq!(short.exit_status(), 7);
        assert_ne!(short.exit_status(), failed.exit_status());
    }
}
