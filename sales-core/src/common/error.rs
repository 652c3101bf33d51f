use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File error for {path}: {message}")]
    File { path: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing required column '{column}' in table '{table}'")]
    Schema { table: String, column: String },

    #[error("Join error: {0}")]
    Join(String),

    #[error("Write error for {path}: {message}")]
    Write { path: String, message: String },

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet failure: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow failure: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EtlError>;
