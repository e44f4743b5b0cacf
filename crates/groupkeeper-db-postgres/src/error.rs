//! Error types for the PostgreSQL storage backend.

use groupkeeper_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for not-null violation (23502).
pub const PG_NOT_NULL_VIOLATION: &str = "23502";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Maps a sqlx error onto the storage error taxonomy.
///
/// Unique, foreign key, check and not-null violations become
/// `ConstraintViolation`. Transport and pool failures become `Connection`.
/// Row decoding failures become `InvalidData`. Everything else is `Internal`.
pub fn classify_sqlx_error(err: SqlxError) -> StorageError {
    if has_pg_error_code(&err, PG_NOT_NULL_VIOLATION) {
        return constraint_violation(&err);
    }

    match &err {
        SqlxError::Database(db_err)
            if db_err.is_unique_violation()
                || db_err.is_foreign_key_violation()
                || db_err.is_check_violation() =>
        {
            constraint_violation(&err)
        }
        SqlxError::Io(_)
        | SqlxError::Tls(_)
        | SqlxError::PoolTimedOut
        | SqlxError::PoolClosed
        | SqlxError::WorkerCrashed => StorageError::connection(err.to_string()),
        SqlxError::ColumnDecode { .. } | SqlxError::Decode(_) | SqlxError::ColumnNotFound(_) => {
            StorageError::invalid_data(err.to_string())
        }
        _ => StorageError::internal(err.to_string()),
    }
}

fn constraint_violation(err: &SqlxError) -> StorageError {
    match err {
        SqlxError::Database(db_err) => match db_err.constraint() {
            Some(constraint) => StorageError::constraint_violation(format!(
                "{} (constraint '{constraint}')",
                db_err.message()
            )),
            None => StorageError::constraint_violation(db_err.message()),
        },
        other => StorageError::constraint_violation(other.to_string()),
    }
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => classify_sqlx_error(e),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
