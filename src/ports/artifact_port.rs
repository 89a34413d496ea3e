//! Model artifact port trait.

use crate::domain::error::SharpefolioError;
use std::collections::BTreeMap;

/// Writes the per-run weights and allocation files. Each method returns the
/// location recorded in the model registry.
pub trait ArtifactPort {
    fn write_weights(
        &self,
        model_id: i64,
        weights: &BTreeMap<String, f64>,
    ) -> Result<String, SharpefolioError>;

    fn write_allocation(
        &self,
        model_id: i64,
        allocation: &BTreeMap<String, i64>,
    ) -> Result<String, SharpefolioError>;
}
