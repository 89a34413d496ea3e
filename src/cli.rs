//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::greedy_allocator::GreedyAllocator;
use crate::adapters::json_artifact_adapter::JsonArtifactAdapter;
use crate::adapters::mean_variance::MeanVarianceOptimizer;
use crate::adapters::sqlite_adapter::SqliteAdapter;
use crate::domain::allocation_model::ModelPorts;
use crate::domain::error::SharpefolioError;
use crate::domain::model_pipeline;
use crate::domain::model_run::ModelRun;
use crate::domain::price_history::{self, RefreshSummary};
use crate::domain::settings::{ModelSettings, PriceHistorySettings, ProviderSettings};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::storage_port::StoragePort;

#[derive(Parser, Debug)]
#[command(
    name = "sharpefolio",
    about = "Daily price-history ETL and max-Sharpe portfolio model"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create one table per ticker and backfill its full history
    PricesInit {
        #[arg(short, long, default_value = "config.ini")]
        config: PathBuf,
    },
    /// Backfill new tickers, then refresh the recent window for all tickers
    PricesUpdate {
        #[arg(short, long, default_value = "config.ini")]
        config: PathBuf,
    },
    /// Create the model registry table
    ModelInit {
        #[arg(short, long, default_value = "config.ini")]
        config: PathBuf,
    },
    /// Fit the model, allocate whole shares and record the run
    ModelRun {
        #[arg(short, long, default_value = "config.ini")]
        config: PathBuf,
    },
    /// Show stored price ranges and the latest model run
    Info {
        #[arg(short, long, default_value = "config.ini")]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::PricesInit { config } => run_prices_init(&config),
        Command::PricesUpdate { config } => run_prices_update(&config),
        Command::ModelInit { config } => run_model_init(&config),
        Command::ModelRun { config } => {
            run_model(&config, Local::now().date_naive()).map(|_| ())
        }
        Command::Info { config } => run_info(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SharpefolioError> {
    FileConfigAdapter::from_file(path)
}

/// Market-data provider selected by `[provider] kind`.
pub fn build_provider(
    settings: &ProviderSettings,
) -> Result<Box<dyn MarketDataPort>, SharpefolioError> {
    match settings {
        ProviderSettings::Csv { dir } => Ok(Box::new(CsvAdapter::new(dir.clone()))),
        #[cfg(feature = "yahoo")]
        ProviderSettings::Yahoo { timeout_secs } => {
            use crate::adapters::yahoo_adapter::YahooAdapter;
            Ok(Box::new(YahooAdapter::new(*timeout_secs)?))
        }
        #[cfg(not(feature = "yahoo"))]
        ProviderSettings::Yahoo { .. } => Err(SharpefolioError::invalid(
            "provider",
            "kind",
            "built without the yahoo feature; use kind = csv",
        )),
    }
}

fn log_summary(summary: &RefreshSummary) {
    info!(
        created = summary.tables_created.len(),
        backfill_rows = summary.backfill_rows,
        recent_rows = summary.recent_rows,
        "price history refreshed"
    );
}

pub fn run_prices_init(config_path: &Path) -> Result<(), SharpefolioError> {
    let config = load_config(config_path)?;
    let settings = PriceHistorySettings::from_config(&config)?;
    let provider = build_provider(&ProviderSettings::from_config(&config)?)?;
    let storage = SqliteAdapter::open(&settings.db_path)?;

    let summary = price_history::bootstrap(&storage, provider.as_ref(), &settings)?;
    log_summary(&summary);
    Ok(())
}

pub fn run_prices_update(config_path: &Path) -> Result<(), SharpefolioError> {
    let config = load_config(config_path)?;
    let settings = PriceHistorySettings::from_config(&config)?;
    let provider = build_provider(&ProviderSettings::from_config(&config)?)?;
    let storage = SqliteAdapter::open(&settings.db_path)?;

    let summary = price_history::run_incremental(&storage, provider.as_ref(), &settings)?;
    log_summary(&summary);
    Ok(())
}

pub fn run_model_init(config_path: &Path) -> Result<(), SharpefolioError> {
    let config = load_config(config_path)?;
    let settings = ModelSettings::from_config(&config)?;
    let registry = SqliteAdapter::open(&settings.db_path)?;
    model_pipeline::bootstrap_registry(&registry, &settings)?;
    Ok(())
}

/// Fit on prices stored before `today` and record the run.
pub fn run_model(config_path: &Path, today: NaiveDate) -> Result<ModelRun, SharpefolioError> {
    let config = load_config(config_path)?;
    let prices = PriceHistorySettings::from_config(&config)?;
    let settings = ModelSettings::from_config(&config)?;

    let price_store = SqliteAdapter::open(&prices.db_path)?;
    let registry = SqliteAdapter::open(&settings.db_path)?;
    let optimizer = MeanVarianceOptimizer::new(settings.risk_free_rate);
    let allocator = GreedyAllocator;
    let artifacts = JsonArtifactAdapter::new(settings.artifact_dir.clone());

    let ports = ModelPorts {
        price_store: &price_store,
        registry: &registry,
        optimizer: &optimizer,
        allocator: &allocator,
        artifacts: &artifacts,
    };
    model_pipeline::run(prices.ticker_map()?, ports, &settings, today)
}

pub fn run_info(config_path: &Path) -> Result<(), SharpefolioError> {
    let config = load_config(config_path)?;
    let prices = PriceHistorySettings::from_config(&config)?;
    let storage = SqliteAdapter::open(&prices.db_path)?;
    let tickers = prices.ticker_map()?;
    let existing = storage.list_tables()?;

    for (symbol, table) in tickers.iter() {
        if !existing.contains(table) {
            println!("{symbol}: no table");
            continue;
        }
        match storage.price_range(table)? {
            Some((first, last, count)) => {
                println!("{symbol}: {count} rows, {first} to {last}")
            }
            None => println!("{symbol}: no data"),
        }
    }

    let settings = ModelSettings::from_config(&config)?;
    let Some(kind) = settings.kind else {
        println!("model {:?}: unknown strategy", settings.name);
        return Ok(());
    };
    let registry = SqliteAdapter::open(&settings.db_path)?;
    if !registry.list_tables()?.contains(kind.registry_table()) {
        println!("model registry: not initialised");
        return Ok(());
    }
    match registry.latest_model_run(kind.registry_table())? {
        Some(run) => println!(
            "latest model run: id {} on {}, {} positions, return {:.1}%, volatility {:.1}%, sharpe {:.2}, leftover ${:.2}",
            run.model_id,
            run.date,
            run.position_count,
            run.expected_return_pct,
            run.volatility_pct,
            run.sharpe_ratio,
            run.leftover_cash
        ),
        None => println!("latest model run: none"),
    }
    Ok(())
}
