//! Tuning knobs for dataset writes.

use parquet::basic::{Compression as ParquetCompression, GzipLevel, ZstdLevel};
use serde::Deserialize;

/// Cap on the number of partition directories one write may create, unless
/// overridden in configuration.
pub const DEFAULT_PARTITION_CEILING: usize = 1024;

/// Partition-planning engine for the write side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Pick for me. Resolves to [`Engine::Capped`].
    #[default]
    Auto,
    /// Enforce the partition ceiling.
    Capped,
    /// No ceiling, for datasets known to be high-cardinality.
    Uncapped,
}

impl Engine {
    /// The engine that actually runs.
    pub fn resolve(self) -> Engine {
        match self {
            Engine::Auto => Engine::Capped,
            other => other,
        }
    }

    pub fn enforces_ceiling(self) -> bool {
        self.resolve() == Engine::Capped
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Auto => "auto",
            Engine::Capped => "capped",
            Engine::Uncapped => "uncapped",
        }
    }
}

/// Parquet compression for the data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Snappy,
    Zstd,
    Gzip,
    Lz4,
    None,
}

impl Compression {
    pub fn to_parquet(self) -> ParquetCompression {
        match self {
            Compression::Snappy => ParquetCompression::SNAPPY,
            Compression::Zstd => ParquetCompression::ZSTD(ZstdLevel::default()),
            Compression::Gzip => ParquetCompression::GZIP(GzipLevel::default()),
            Compression::Lz4 => ParquetCompression::LZ4_RAW,
            Compression::None => ParquetCompression::UNCOMPRESSED,
        }
    }
}

/// Options for one dataset write.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub engine: Engine,
    pub compression: Compression,
    /// Replaces [`DEFAULT_PARTITION_CEILING`] when set.
    pub partition_ceiling_override: Option<usize>,
}
