//! Error types for database operations

use roster_core::{Error as CoreError, Resource};
use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for CoreError {
    fn from(err: Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}

/// Classify a query failure against the keyed record it touched
///
/// A missing row becomes `NotFound` and a unique violation `AlreadyExists`;
/// anything else is an infrastructure failure.
pub(crate) fn classify(err: sqlx::Error, resource: impl FnOnce() -> Resource) -> CoreError {
    match err {
        sqlx::Error::RowNotFound => CoreError::NotFound(resource()),
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            CoreError::AlreadyExists(resource())
        }
        other => CoreError::Internal(other.to_string()),
    }
}

/// Map a failure with no keyed record behind it
pub(crate) fn internal(err: sqlx::Error) -> CoreError {
    CoreError::Internal(err.to_string())
}
