//! Port traits the domain depends on.

pub mod artifact_port;
pub mod config_port;
pub mod market_data_port;
pub mod optimizer_port;
pub mod storage_port;
