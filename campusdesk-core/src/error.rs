//! Error types for campusdesk.

use thiserror::Error;

/// Errors that can occur in campusdesk operations.
#[derive(Error, Debug)]
pub enum CampusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Unsupported export format '{0}'")]
    UnsupportedFormat(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CampusError {
    fn from(e: serde_json::Error) -> Self {
        CampusError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for CampusError {
    fn from(e: csv::Error) -> Self {
        CampusError::Serialization(e.to_string())
    }
}

/// Result type alias for campusdesk operations.
pub type CampusResult<T> = Result<T, CampusError>;
