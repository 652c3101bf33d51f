//! The ETL pipeline: load, clean, join, write, read back.

pub mod dataset;
pub mod join;
pub mod loader;
pub mod orchestrator;
pub mod transform;
