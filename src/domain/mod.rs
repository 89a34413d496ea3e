//! Core domain types and pipeline logic.

pub mod allocation_model;
pub mod error;
pub mod gatherer;
pub mod model_pipeline;
pub mod model_run;
pub mod optimization;
pub mod period;
pub mod price;
pub mod price_frame;
pub mod price_history;
pub mod schema;
pub mod settings;
pub mod ticker;
