//! Error handling for the explorer pipeline.

use std::fmt;
use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for loading, filtering and ranking
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    /// The input could not be parsed as a table at all
    #[error("Load error: {0}")]
    Load(String),

    /// A column the requested operation depends on is absent or has the wrong type
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid or unresolvable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error raised by an Arrow compute kernel
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error decoding a Parquet source
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error reading a JSON configuration file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExplorerError {
    /// Create a load error
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load(message.into())
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a schema error for a column the operation needs but the data lacks
    pub fn column_not_found(column: &str) -> Self {
        Self::Schema(format!("Column '{column}' not found"))
    }

    /// Create a schema error for a column with an unexpected Arrow type
    pub fn column_type(column: &str, expected: &str) -> Self {
        Self::Schema(format!("Column '{column}' is not a {expected} array"))
    }
}

/// Result type for explorer operations
pub type Result<T> = std::result::Result<T, ExplorerError>;

/// Raised alongside a successful result when a filter or join matched nothing.
///
/// This is not an error: callers are expected to render it as a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyResultWarning {
    /// What was queried, e.g. `"Amoxicillin — 0-2"`
    pub subject: String,
}

impl EmptyResultWarning {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

impl fmt::Display for EmptyResultWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No data for {}", self.subject)
    }
}
