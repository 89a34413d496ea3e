//! Model pipeline: registry bootstrap and the build, train, allocate, save run.

use crate::domain::allocation_model::{AllocationModel, ModelPorts};
use crate::domain::error::SharpefolioError;
use crate::domain::model_run::{ModelKind, ModelRun};
use crate::domain::settings::ModelSettings;
use crate::domain::ticker::TickerMap;
use crate::ports::storage_port::StoragePort;
use chrono::NaiveDate;
use tracing::{info, warn};

/// Create the registry table for the configured strategy. Returns `false`
/// when the configured model name is not a known strategy.
pub fn bootstrap_registry(
    registry: &dyn StoragePort,
    settings: &ModelSettings,
) -> Result<bool, SharpefolioError> {
    match settings.kind {
        Some(kind) => {
            registry.create_table(kind.registry_table(), &settings.columns)?;
            info!(table = kind.registry_table(), "model registry ready");
            Ok(true)
        }
        None => {
            warn!(model = %settings.name, "unknown model, registry not created");
            Ok(false)
        }
    }
}

/// Run the max-Sharpe model end to end. No step is retried or skipped.
pub fn run(
    tickers: TickerMap,
    ports: ModelPorts<'_>,
    settings: &ModelSettings,
    today: NaiveDate,
) -> Result<ModelRun, SharpefolioError> {
    let kind = settings.kind.ok_or_else(|| SharpefolioError::ConfigInvalid {
        section: "model".into(),
        key: "name".into(),
        reason: format!("unknown model {:?}", settings.name),
    })?;

    let model = match kind {
        ModelKind::MaxSharpe => AllocationModel::new(tickers, ports, kind.registry_table())
            .with_portfolio_value(settings.portfolio_value),
    };

    let frame = model.build_price_frame(today)?;
    let fitted = model.train_sharpe_model(&frame)?;
    let outcome = model.compute_discrete_allocation(&frame, &fitted)?;
    model.save_model(&fitted, &outcome, today)
}
