//! Versioned model-run records.

use chrono::NaiveDate;

/// One row of the model registry. Runs are append-only: a row is written
/// once per successful pipeline execution and never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRun {
    pub model_id: i64,
    pub date: NaiveDate,
    pub position_count: usize,
    pub expected_return_pct: f64,
    pub volatility_pct: f64,
    pub sharpe_ratio: f64,
    pub leftover_cash: f64,
    pub weights_file_path: String,
    pub allocation_file_path: String,
}

/// Allocation strategies the model pipeline knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    MaxSharpe,
}

impl ModelKind {
    /// Recognises `max_sharpe` and the legacy strategy name `pyportfolioopt`,
    /// case-insensitively, anywhere in `name`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.contains("max_sharpe") || name.contains("pyportfolioopt") {
            Some(ModelKind::MaxSharpe)
        } else {
            None
        }
    }

    /// Registry table holding this strategy's runs.
    pub fn registry_table(&self) -> &'static str {
        match self {
            ModelKind::MaxSharpe => "pyportfolioopt",
        }
    }
}

/// Next id after `current_max`, starting at 0 for an empty registry.
pub fn next_model_id(current_max: Option<i64>) -> i64 {
    current_max.map_or(0, |id| id + 1)
}
