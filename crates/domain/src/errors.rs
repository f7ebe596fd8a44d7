//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Branch code is empty, too long, or contains non-alphanumerics
    #[error("Invalid branch code: {0}")]
    InvalidBranchCode(String),

    /// Branch identifier is empty
    #[error("Invalid branch id: {0:?}")]
    InvalidBranchId(String),

    /// Year outside of the four-digit range
    #[error("Invalid year: {0}")]
    InvalidYear(i32),

    /// Sequence numbers start at 1
    #[error("Invalid sequence number: {0}")]
    InvalidSequenceNumber(i64),

    /// Reference string could not be parsed
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Identifier could not be parsed
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    /// Entity not found
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Sync state machine rejected the transition
    #[error("Invalid sync transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Operation not permitted in the current state
    #[error("Operation not permitted: {0}")]
    NotPermitted(String),
}

impl DomainError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}
