//! Typed settings built from configuration.
//!
//! Everything is validated up front so the pipelines never see a half-formed
//! configuration.

use crate::domain::error::SharpefolioError;
use crate::domain::model_run::ModelKind;
use crate::domain::period::{LookbackPeriod, RECENT_WINDOW};
use crate::domain::schema::{
    ColumnSpec, MODEL_REGISTRY_COLUMNS, MODEL_REGISTRY_WIDTH, PRICE_FIELDS, PRICE_TABLE_COLUMNS,
    parse_columns,
};
use crate::domain::ticker::{TickerMap, parse_tickers};
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

pub const DEFAULT_PORTFOLIO_VALUE: f64 = 10_000.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;
pub const DEFAULT_ARTIFACT_DIR: &str = "model_reg/pyportfolioopt";
pub const DEFAULT_TIMEOUT_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistorySettings {
    pub db_path: String,
    pub tickers: Vec<String>,
    pub columns: Vec<ColumnSpec>,
    pub backfill_period: LookbackPeriod,
    pub recent_period: LookbackPeriod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSettings {
    Yahoo { timeout_secs: u64 },
    Csv { dir: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub name: String,
    pub kind: Option<ModelKind>,
    pub db_path: String,
    pub columns: Vec<ColumnSpec>,
    pub artifact_dir: PathBuf,
    pub portfolio_value: f64,
    pub risk_free_rate: f64,
}

impl PriceHistorySettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SharpefolioError> {
        let db_path = require(config, "price_history", "db")?;

        let tickers_str = require(config, "price_history", "tickers")?;
        let tickers = parse_tickers(&tickers_str)
            .map_err(|e| SharpefolioError::invalid("price_history", "tickers", e.to_string()))?;
        TickerMap::new(&tickers)?;

        let columns = columns_or_default(config, "price_history", PRICE_TABLE_COLUMNS)?;
        for required in PRICE_FIELDS {
            if !columns.iter().any(|c| c.name.eq_ignore_ascii_case(required)) {
                return Err(SharpefolioError::invalid(
                    "price_history",
                    "columns",
                    format!("missing required column {required}"),
                ));
            }
        }

        Ok(Self {
            db_path,
            tickers,
            columns,
            backfill_period: period_or(config, "backfill_period", LookbackPeriod::Max)?,
            recent_period: period_or(config, "recent_period", RECENT_WINDOW)?,
        })
    }

    pub fn ticker_map(&self) -> Result<TickerMap, SharpefolioError> {
        TickerMap::new(&self.tickers)
    }
}

impl ProviderSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SharpefolioError> {
        let kind = config
            .get_non_empty("provider", "kind")
            .unwrap_or_else(|| "yahoo".to_string());

        match kind.to_lowercase().as_str() {
            "yahoo" => {
                let timeout = config.get_int("provider", "timeout_secs", DEFAULT_TIMEOUT_SECS);
                if timeout <= 0 {
                    return Err(SharpefolioError::invalid(
                        "provider",
                        "timeout_secs",
                        "timeout_secs must be positive",
                    ));
                }
                Ok(ProviderSettings::Yahoo {
                    timeout_secs: timeout as u64,
                })
            }
            "csv" => Ok(ProviderSettings::Csv {
                dir: PathBuf::from(require(config, "provider", "csv_dir")?),
            }),
            other => Err(SharpefolioError::invalid(
                "provider",
                "kind",
                format!("unknown provider {other:?} (expected yahoo or csv)"),
            )),
        }
    }
}

impl ModelSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SharpefolioError> {
        let name = config
            .get_non_empty("model", "name")
            .unwrap_or_else(|| "max_sharpe".to_string());
        let db_path = require(config, "model", "db")?;

        let columns = columns_or_default(config, "model", MODEL_REGISTRY_COLUMNS)?;
        if columns.len() != MODEL_REGISTRY_WIDTH {
            return Err(SharpefolioError::invalid(
                "model",
                "columns",
                format!(
                    "registry needs exactly {MODEL_REGISTRY_WIDTH} columns, got {}",
                    columns.len()
                ),
            ));
        }
        if !columns[0].name.eq_ignore_ascii_case("model_id") {
            return Err(SharpefolioError::invalid(
                "model",
                "columns",
                format!("first registry column must be model_id, got {}", columns[0].name),
            ));
        }

        let portfolio_value =
            config.get_double("model", "portfolio_value", DEFAULT_PORTFOLIO_VALUE);
        if portfolio_value <= 0.0 {
            return Err(SharpefolioError::invalid(
                "model",
                "portfolio_value",
                "portfolio_value must be positive",
            ));
        }

        let risk_free_rate = config.get_double("model", "risk_free_rate", DEFAULT_RISK_FREE_RATE);
        if !(0.0..1.0).contains(&risk_free_rate) {
            return Err(SharpefolioError::invalid(
                "model",
                "risk_free_rate",
                "risk_free_rate must be between 0 and 1",
            ));
        }

        Ok(Self {
            kind: ModelKind::from_name(&name),
            name,
            db_path,
            columns,
            artifact_dir: PathBuf::from(
                config
                    .get_non_empty("model", "artifact_dir")
                    .unwrap_or_else(|| DEFAULT_ARTIFACT_DIR.to_string()),
            ),
            portfolio_value,
            risk_free_rate,
        })
    }
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, SharpefolioError> {
    config
        .get_non_empty(section, key)
        .ok_or_else(|| SharpefolioError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

fn columns_or_default(
    config: &dyn ConfigPort,
    section: &str,
    default: &str,
) -> Result<Vec<ColumnSpec>, SharpefolioError> {
    let raw = config
        .get_non_empty(section, "columns")
        .unwrap_or_else(|| default.to_string());
    parse_columns(&raw).map_err(|e| SharpefolioError::invalid(section, "columns", e.to_string()))
}

fn period_or(
    config: &dyn ConfigPort,
    key: &str,
    default: LookbackPeriod,
) -> Result<LookbackPeriod, SharpefolioError> {
    match config.get_non_empty("price_history", key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: crate::domain::period::PeriodParseError| {
                SharpefolioError::invalid("price_history", key, e.to_string())
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfig(HashMap<(String, String), String>);

    impl MapConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                    .collect(),
            )
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0.get(&(section.to_string(), key.to_string())).cloned()
        }
        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    #[test]
    fn price_history_defaults() {
        let config = MapConfig::new(&[
            ("price_history", "db", "prices.db"),
            ("price_history", "tickers", "voo, btc-usd"),
        ]);
        let settings = PriceHistorySettings::from_config(&config).unwrap();
        assert_eq!(settings.tickers, vec!["voo", "btc-usd"]);
        assert_eq!(settings.columns.len(), 8);
        assert_eq!(settings.backfill_period, LookbackPeriod::Max);
        assert_eq!(settings.recent_period, LookbackPeriod::Days(5));
    }

    #[test]
    fn price_history_missing_db() {
        let config = MapConfig::new(&[("price_history", "tickers", "voo")]);
        let err = PriceHistorySettings::from_config(&config).unwrap_err();
        assert!(matches!(err, SharpefolioError::ConfigMissing { key, .. } if key == "db"));
    }

    #[test]
    fn price_history_rejects_duplicate_ticker() {
        let config = MapConfig::new(&[
            ("price_history", "db", "prices.db"),
            ("price_history", "tickers", "voo,aapl,voo"),
        ]);
        let err = PriceHistorySettings::from_config(&config).unwrap_err();
        assert!(matches!(err, SharpefolioError::ConfigInvalid { key, .. } if key == "tickers"));
    }

    #[test]
    fn price_history_rejects_colliding_tickers() {
        let config = MapConfig::new(&[
            ("price_history", "db", "prices.db"),
            ("price_history", "tickers", "btc-usd,btc_usd"),
        ]);
        let err = PriceHistorySettings::from_config(&config).unwrap_err();
        assert!(matches!(err, SharpefolioError::TickerCollision { .. }));
    }

    #[test]
    fn price_history_schema_needs_close() {
        let config = MapConfig::new(&[
            ("price_history", "db", "prices.db"),
            ("price_history", "tickers", "voo"),
            ("price_history", "columns", "date text, open real, high real, low real"),
        ]);
        let err = PriceHistorySettings::from_config(&config).unwrap_err();
        assert!(matches!(err, SharpefolioError::ConfigInvalid { reason, .. } if reason.contains("close")));
    }

    #[test]
    fn price_history_schema_needs_every_written_column() {
        let config = MapConfig::new(&[
            ("price_history", "db", "prices.db"),
            ("price_history", "tickers", "voo"),
            (
                "price_history",
                "columns",
                "date text, open real, high real, low real, close real, volume integer",
            ),
        ]);
        let err = PriceHistorySettings::from_config(&config).unwrap_err();
        assert!(matches!(err, SharpefolioError::ConfigInvalid { reason, .. } if reason.contains("dividends")));
    }

    #[test]
    fn price_history_bad_period() {
        let config = MapConfig::new(&[
            ("price_history", "db", "prices.db"),
            ("price_history", "tickers", "voo"),
            ("price_history", "recent_period", "3d"),
        ]);
        let err = PriceHistorySettings::from_config(&config).unwrap_err();
        assert!(matches!(err, SharpefolioError::ConfigInvalid { key, .. } if key == "recent_period"));
    }

    #[test]
    fn provider_defaults_to_yahoo() {
        let config = MapConfig::new(&[]);
        let provider = ProviderSettings::from_config(&config).unwrap();
        assert_eq!(
            provider,
            ProviderSettings::Yahoo { timeout_secs: 30 }
        );
    }

    #[test]
    fn provider_csv_needs_dir() {
        let config = MapConfig::new(&[("provider", "kind", "csv")]);
        assert!(matches!(
            ProviderSettings::from_config(&config),
            Err(SharpefolioError::ConfigMissing { key, .. }) if key == "csv_dir"
        ));

        let config = MapConfig::new(&[("provider", "kind", "CSV"), ("provider", "csv_dir", "data")]);
        assert_eq!(
            ProviderSettings::from_config(&config).unwrap(),
            ProviderSettings::Csv {
                dir: PathBuf::from("data")
            }
        );
    }

    #[test]
    fn provider_unknown_kind() {
        let config = MapConfig::new(&[("provider", "kind", "bloomberg")]);
        assert!(matches!(
            ProviderSettings::from_config(&config),
            Err(SharpefolioError::ConfigInvalid { key, .. }) if key == "kind"
        ));
    }

    #[test]
    fn model_defaults() {
        let config = MapConfig::new(&[("model", "db", "models.db")]);
        let settings = ModelSettings::from_config(&config).unwrap();
        assert_eq!(settings.kind, Some(ModelKind::MaxSharpe));
        assert_eq!(settings.columns.len(), MODEL_REGISTRY_WIDTH);
        assert_eq!(settings.portfolio_value, DEFAULT_PORTFOLIO_VALUE);
        assert_eq!(settings.risk_free_rate, DEFAULT_RISK_FREE_RATE);
        assert_eq!(settings.artifact_dir, PathBuf::from(DEFAULT_ARTIFACT_DIR));
    }

    #[test]
    fn model_unknown_strategy_has_no_kind() {
        let config = MapConfig::new(&[("model", "db", "models.db"), ("model", "name", "risk_parity")]);
        let settings = ModelSettings::from_config(&config).unwrap();
        assert_eq!(settings.kind, None);
    }

    #[test]
    fn model_rejects_short_registry_schema() {
        let config = MapConfig::new(&[
            ("model", "db", "models.db"),
            ("model", "columns", "model_id integer, date text"),
        ]);
        let err = ModelSettings::from_config(&config).unwrap_err();
        assert!(matches!(err, SharpefolioError::ConfigInvalid { key, .. } if key == "columns"));
    }

    #[test]
    fn model_registry_must_start_with_model_id() {
        let config = MapConfig::new(&[
            ("model", "db", "models.db"),
            (
                "model",
                "columns",
                "run_id integer, date text, position_count integer, expected_return_pct real, \
                 volatility_pct real, sharpe_ratio real, leftover_cash real, \
                 weights_file_path text, allocation_file_path text",
            ),
        ]);
        let err = ModelSettings::from_config(&config).unwrap_err();
        assert!(matches!(err, SharpefolioError::ConfigInvalid { reason, .. } if reason.contains("model_id")));
    }

    #[test]
    fn model_rejects_non_positive_value_and_bad_rate() {
        let config = MapConfig::new(&[("model", "db", "m.db"), ("model", "portfolio_value", "0")]);
        assert!(ModelSettings::from_config(&config).is_err());

        let config = MapConfig::new(&[("model", "db", "m.db"), ("model", "risk_free_rate", "1.5")]);
        assert!(ModelSettings::from_config(&config).is_err());
    }
}
