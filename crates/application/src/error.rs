//! Application-level errors

use domain::{DomainError, NumberingScope};
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Clone, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Request rejected before any I/O was attempted
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The letter repository could not be reached
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Every candidate number in the scope was claimed by someone else
    #[error("Could not allocate a number in {scope} after {attempts} attempts")]
    AllocationConflict { scope: NumberingScope, attempts: u32 },

    /// The local draft cache failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Submission was queued because the repository is offline
    #[error("Offline: {0}")]
    Offline(String),

    /// Retry budget used up
    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// The draft was abandoned while the operation was running
    #[error("Draft abandoned: {0}")]
    Abandoned(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not valid in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connectivity(_) | Self::AllocationConflict { .. }
        )
    }
}
