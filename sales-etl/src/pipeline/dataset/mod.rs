//! The output dataset: Hive-partitioned parquet under one destination
//! directory, with a filtered read-back path.

mod options;
mod partition;
mod reader;
mod writer;

pub use options::{Compression, Engine, WriteOptions, DEFAULT_PARTITION_CEILING};
pub use partition::HIVE_DEFAULT_PARTITION;
pub use reader::read_dataset;
pub use writer::{write_dataset, WriteSummary};
