//! Pipeline configuration loaded from a TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use sales_core::{EtlError, Result};
use serde::Deserialize;

use crate::pipeline::dataset::{Compression, Engine};

/// Top-level configuration for one pipeline run.
#[derive(Debug, Clone, Deserialize)]
pub struct EtlConfig {
    pub tables: TablesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

/// Locations of the three source tables.
#[derive(Debug, Clone, Deserialize)]
pub struct TablesConfig {
    pub orders: TableSource,
    pub items: TableSource,
    pub products: TableSource,
}

/// One CSV source file and its field separator.
#[derive(Debug, Clone, Deserialize)]
pub struct TableSource {
    pub path: PathBuf,
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl TableSource {
    /// The separator as the single byte the CSV reader wants.
    pub fn delimiter(&self) -> Result<u8> {
        let bytes = self.separator.as_bytes();
        if bytes.len() != 1 {
            return Err(EtlError::Config(format!(
                "separator must be a single byte, got {:?}",
                self.separator
            )));
        }
        Ok(bytes[0])
    }
}

/// Where and how the joined dataset is written. The path has no default;
/// a run with no configured destination is refused up front.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub compression: Compression,
    /// Replaces the built-in partition ceiling when set.
    #[serde(default)]
    pub partition_ceiling_override: Option<usize>,
    /// When set, the run report is serialized to this path as JSON.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            path: PathBuf::new(),
            engine: Engine::default(),
            compression: Compression::default(),
            partition_ceiling_override: None,
            report_path: None,
        }
    }
}

/// Knobs for the cleaning step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformConfig {
    /// Fail the run on any unparseable purchase timestamp instead of
    /// dropping the row.
    #[serde(default)]
    pub strict_timestamps: bool,
}

fn default_separator() -> String {
    ",".to_string()
}

impl EtlConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| EtlError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: EtlConfig =
            toml::from_str(&raw).map_err(|e| EtlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would fail later in less obvious ways.
    pub fn validate(&self) -> Result<()> {
        if self.output.path.as_os_str().is_empty() {
            return Err(EtlError::Config("output.path is not configured".to_string()));
        }
        for (name, source) in [
            ("orders", &self.tables.orders),
            ("items", &self.tables.items),
            ("products", &self.tables.products),
        ] {
            source
                .delimiter()
                .map_err(|e| EtlError::Config(format!("tables.{name}: {e}")))?;
        }
        if let Some(ceiling) = self.output.partition_ceiling_override {
            if ceiling == 0 {
                return Err(EtlError::Config(
                    "output.partition_ceiling_override must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}
