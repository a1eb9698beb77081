//! Error types for SpendWise

use thiserror::Error;

/// Result type alias for SpendWise operations
pub type Result<T> = std::result::Result<T, SpendwiseError>;

/// Main error type for SpendWise
#[derive(Error, Debug)]
pub enum SpendwiseError {
    #[error("Schema not found for entity: {0}")]
    SchemaNotFound(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Missing argument: {0} is required")]
    MissingArgument(&'static str),

    #[error("Unsupported migration: {0}")]
    UnsupportedMigration(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Date normalization error: {0}")]
    DateNormalization(String),

    #[error("Remote I/O error: {0}")]
    RemoteIo(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SpendwiseError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            SpendwiseError::RemoteIo(_) => true,
            SpendwiseError::Storage(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Stable numeric code, used by the CLI exit status
    pub fn code(&self) -> i32 {
        match self {
            SpendwiseError::SchemaNotFound(_) => 10,
            SpendwiseError::InvalidSchema(_) => 11,
            SpendwiseError::MissingArgument(_) => 12,
            SpendwiseError::UnsupportedMigration(_) => 13,
            SpendwiseError::Storage(_) => 20,
            SpendwiseError::DateNormalization(_) => 30,
            SpendwiseError::RemoteIo(_) => 40,
            SpendwiseError::InvalidInput(_) => 2,
            _ => 1,
        }
    }
}
