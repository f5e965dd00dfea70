//! Error types for ecoproxy
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// ecoproxy error types
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed assumptions document
    #[error("Configuration error: {0}")]
    Config(String),

    /// Expression contains a forbidden token (rejected before parsing)
    #[error("Unsafe expression: found forbidden pattern '{pattern}' in `{expression}`")]
    UnsafeExpression {
        /// Offending expression text
        expression: String,
        /// Pattern that matched
        pattern: String,
    },

    /// Expression does not fit the metric grammar or references unknown names
    #[error("Invalid expression `{expression}`: {reason}")]
    InvalidExpression {
        /// Offending expression text
        expression: String,
        /// What went wrong
        reason: String,
    },

    /// Required column missing from the input table
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Input document (assumptions, pipeline config) does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Storage error (CSV/Parquet)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Remote dataset download failed
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn invalid_expression(expression: &str, reason: impl Into<String>) -> Self {
        Self::InvalidExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}
