//! sharpefolio: daily price-history ETL into SQLite and a max-Sharpe
//! portfolio model with a versioned run registry.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
