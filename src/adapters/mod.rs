//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod greedy_allocator;
pub mod json_artifact_adapter;
pub mod mean_variance;
pub mod sqlite_adapter;
#[cfg(feature = "yahoo")]
pub mod yahoo_adapter;
