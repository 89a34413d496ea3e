//! Maximum-Sharpe allocation model.
//!
//! A run goes through four steps in fixed order: build the joined close-price
//! frame, fit the max-Sharpe weights, turn them into whole shares, and record
//! the run in the model registry. Each step returns its result.

use crate::domain::error::SharpefolioError;
use crate::domain::model_run::{ModelRun, next_model_id};
use crate::domain::optimization::{DiscreteAllocation, Performance, clean_weights, ensure_long_only};
use crate::domain::price_frame::PriceFrame;
use crate::domain::settings::DEFAULT_PORTFOLIO_VALUE;
use crate::domain::ticker::TickerMap;
use crate::ports::artifact_port::ArtifactPort;
use crate::ports::optimizer_port::{DiscreteAllocator, PortfolioOptimizer};
use crate::ports::storage_port::StoragePort;
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;
use tracing::info;

/// Fitted max-Sharpe model.
#[derive(Debug, Clone)]
pub struct SharpeModel {
    pub tickers: Vec<String>,
    pub expected_returns: DVector<f64>,
    pub covariance: DMatrix<f64>,
    /// Optimiser output, aligned with `tickers`.
    pub raw_weights: DVector<f64>,
    /// Cleaned weights, aligned with `tickers`.
    pub weights: Vec<(String, f64)>,
}

impl SharpeModel {
    pub fn weight_map(&self) -> BTreeMap<String, f64> {
        self.weights.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOutcome {
    pub allocation: DiscreteAllocation,
    pub performance: Performance,
}

/// The collaborators a model run needs.
pub struct ModelPorts<'a> {
    pub price_store: &'a dyn StoragePort,
    pub registry: &'a dyn StoragePort,
    pub optimizer: &'a dyn PortfolioOptimizer,
    pub allocator: &'a dyn DiscreteAllocator,
    pub artifacts: &'a dyn ArtifactPort,
}

pub struct AllocationModel<'a> {
    tickers: TickerMap,
    ports: ModelPorts<'a>,
    registry_table: String,
    portfolio_value: f64,
}

impl<'a> AllocationModel<'a> {
    pub fn new(tickers: TickerMap, ports: ModelPorts<'a>, registry_table: &str) -> Self {
        Self {
            tickers,
            ports,
            registry_table: registry_table.to_string(),
            portfolio_value: DEFAULT_PORTFOLIO_VALUE,
        }
    }

    pub fn with_portfolio_value(mut self, value: f64) -> Self {
        self.portfolio_value = value;
        self
    }

    pub fn portfolio_value(&self) -> f64 {
        self.portfolio_value
    }

    /// Latest "earliest stored date" across all tickers. The frame cannot
    /// start before the youngest series begins.
    pub fn common_start_date(&self) -> Result<NaiveDate, SharpefolioError> {
        let mut start: Option<(NaiveDate, &str)> = None;
        for table in self.tickers.tables() {
            let earliest = self
                .ports
                .price_store
                .earliest_date(table)?
                .ok_or_else(|| SharpefolioError::NoPriceHistory {
                    ticker: table.to_string(),
                })?;
            if start.is_none_or(|(current, _)| earliest > current) {
                start = Some((earliest, table));
            }
        }

        let (date, youngest) = start.ok_or_else(|| SharpefolioError::InsufficientData {
            reason: "no tickers configured".into(),
        })?;
        info!(%date, youngest, "common start date");
        Ok(date)
    }

    /// Closes from the common start date up to, but excluding, `today`,
    /// inner-joined on date.
    pub fn build_price_frame(&self, today: NaiveDate) -> Result<PriceFrame, SharpefolioError> {
        let start = self.common_start_date()?;

        let mut series = Vec::with_capacity(self.tickers.len());
        for table in self.tickers.tables() {
            let closes = self.ports.price_store.closes_between(table, start, today)?;
            series.push((table.to_string(), closes));
        }

        let frame = PriceFrame::inner_join(series)?;
        if frame.len() < 2 {
            return Err(SharpefolioError::InsufficientData {
                reason: format!(
                    "need at least 2 common dates between {start} and {today}, found {}",
                    frame.len()
                ),
            });
        }
        info!(
            rows = frame.len(),
            tickers = frame.tickers.len(),
            "built price frame"
        );
        Ok(frame)
    }

    /// Fit long-only max-Sharpe weights. A negative weight is a fatal
    /// [`SharpefolioError::ShortPosition`].
    pub fn train_sharpe_model(&self, frame: &PriceFrame) -> Result<SharpeModel, SharpefolioError> {
        let optimizer = self.ports.optimizer;
        let expected_returns = optimizer.expected_returns(frame)?;
        let covariance = optimizer.sample_covariance(frame)?;
        let raw_weights = optimizer.max_sharpe(&expected_returns, &covariance)?;

        let weights = clean_weights(&frame.tickers, raw_weights.as_slice());
        ensure_long_only(&weights)?;

        Ok(SharpeModel {
            tickers: frame.tickers.clone(),
            expected_returns,
            covariance,
            raw_weights,
            weights,
        })
    }

    /// Whole-share allocation against the frame's latest prices, plus the
    /// realised performance of the fitted weights.
    pub fn compute_discrete_allocation(
        &self,
        frame: &PriceFrame,
        model: &SharpeModel,
    ) -> Result<AllocationOutcome, SharpefolioError> {
        let latest_prices = frame.latest_prices();
        let allocation =
            self.ports
                .allocator
                .allocate(&model.weights, &latest_prices, self.portfolio_value)?;

        println!("Discrete allocation: {:?}", allocation.shares);
        println!("Funds remaining: ${:.2}", allocation.leftover);

        let performance = self.ports.optimizer.portfolio_performance(
            &model.raw_weights,
            &model.expected_returns,
            &model.covariance,
        );
        println!(
            "Expected annual return: {:.1}%",
            performance.expected_return * 100.0
        );
        println!("Annual volatility: {:.1}%", performance.volatility * 100.0);
        println!("Sharpe Ratio: {:.2}", performance.sharpe_ratio);

        Ok(AllocationOutcome {
            allocation,
            performance,
        })
    }

    /// Write the run's artifacts and append it to the registry under the next
    /// free id.
    pub fn save_model(
        &self,
        model: &SharpeModel,
        outcome: &AllocationOutcome,
        run_date: NaiveDate,
    ) -> Result<ModelRun, SharpefolioError> {
        let model_id = next_model_id(self.ports.registry.max_model_id(&self.registry_table)?);

        let weights_file_path = self
            .ports
            .artifacts
            .write_weights(model_id, &model.weight_map())?;
        let allocation_file_path = self
            .ports
            .artifacts
            .write_allocation(model_id, &outcome.allocation.shares)?;

        let run = ModelRun {
            model_id,
            date: run_date,
            position_count: outcome.allocation.position_count(),
            expected_return_pct: outcome.performance.expected_return * 100.0,
            volatility_pct: outcome.performance.volatility * 100.0,
            sharpe_ratio: outcome.performance.sharpe_ratio,
            leftover_cash: outcome.allocation.leftover,
            weights_file_path,
            allocation_file_path,
        };
        self.ports
            .registry
            .insert_model_run(&self.registry_table, &run)?;

        info!(model_id, positions = run.position_count, "saved model run");
        Ok(run)
    }
}
