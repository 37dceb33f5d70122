//! Error types for Cabinet.

use thiserror::Error;

/// Common error type for Cabinet.
#[derive(Error, Debug)]
pub enum CabinetError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant automatically.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input or an invalid argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The request conflicts with the current state of a resource.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Blob storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Archive creation failure.
    #[error("archive error: {0}")]
    Archive(String),

    /// The operation did not finish within its time budget.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure (e.g. password hashing).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for CabinetError {
    fn from(e: sqlx::Error) -> Self {
        CabinetError::Database(e.to_string())
    }
}

impl From<zip::result::ZipError> for CabinetError {
    fn from(e: zip::result::ZipError) -> Self {
        CabinetError::Archive(e.to_string())
    }
}

/// Result type alias for Cabinet operations.
pub type Result<T> = std::result::Result<T, CabinetError>;
