//! Main library crate for the sales ETL pipeline

pub mod config;
pub mod constants;
pub mod observability;
pub mod pipeline;

// Re-export commonly used types
pub use sales_core::{EtlError, Filter, FilterOp, Result, Table, Value};
