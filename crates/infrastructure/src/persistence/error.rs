//! Shared error mapping for sqlx persistence layer

use application::error::ApplicationError;

/// Map a draft-cache error
///
/// Anything the database reports is a storage failure, which lets the
/// local tier fall back to session memory.
pub fn map_sqlx_error(e: sqlx::Error) -> ApplicationError {
    match e {
        sqlx::Error::RowNotFound => {
            ApplicationError::NotFound("Database record not found".to_string())
        },
        other => ApplicationError::Storage(format!("Database error: {other}")),
    }
}

/// Map a letter-repository error
///
/// Lock contention and an unavailable pool are transient and reported as
/// connectivity problems so callers retry them.
pub fn map_repository_error(e: sqlx::Error) -> ApplicationError {
    match e {
        sqlx::Error::RowNotFound => {
            ApplicationError::NotFound("Database record not found".to_string())
        },
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            ApplicationError::Connectivity(format!("Letter store unavailable: {e}"))
        },
        sqlx::Error::Database(db_err) if is_busy(db_err.message()) => {
            ApplicationError::Connectivity(format!("Letter store busy: {db_err}"))
        },
        other => ApplicationError::Internal(format!("Database error: {other}")),
    }
}

/// Error for a row that does not decode into a domain value
pub fn corrupt_row(what: &str, e: impl std::fmt::Display) -> ApplicationError {
    ApplicationError::Internal(format!("Corrupt {what} row: {e}"))
}

fn is_busy(message: &str) -> bool {
    message.contains("database is locked") || message.contains("database is busy")
}
