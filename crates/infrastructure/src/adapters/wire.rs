//! JSON bodies of the letter repository HTTP API
//!
//! Shared by the HTTP repository client and the server so both sides agree
//! on the shapes. Reservations, letters and reservation outcomes travel as
//! their domain/port types.

use domain::{BranchCode, DomainError, LocalId, NumberingScope, RemoteId, SequenceNumber};
use serde::{Deserialize, Serialize};

/// Header carrying the idempotency key of `POST /v1/letters`
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// `code` of a 409 answer to a repeated insert
pub const ALREADY_APPLIED: &str = "already_applied";

/// `GET /v1/scopes/{branch_code}/{year}/max`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxResponse {
    pub max: Option<SequenceNumber>,
}

/// `POST /v1/reservations`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRequest {
    pub branch_code: BranchCode,
    pub year: i32,
    pub sequence_number: SequenceNumber,
    pub idempotency_key: LocalId,
}

impl ReserveRequest {
    pub fn new(scope: &NumberingScope, sequence_number: SequenceNumber, key: LocalId) -> Self {
        Self {
            branch_code: scope.branch_code().clone(),
            year: scope.year(),
            sequence_number,
            idempotency_key: key,
        }
    }

    pub fn scope(&self) -> Result<NumberingScope, DomainError> {
        NumberingScope::new(self.branch_code.clone(), self.year)
    }
}

/// `POST /v1/letters`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertResponse {
    pub remote_id: RemoteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl InsertResponse {
    pub const fn created(remote_id: RemoteId) -> Self {
        Self {
            remote_id,
            code: None,
        }
    }

    pub fn already_applied(remote_id: RemoteId) -> Self {
        Self {
            remote_id,
            code: Some(ALREADY_APPLIED.to_string()),
        }
    }

    pub fn is_already_applied(&self) -> bool {
        self.code.as_deref() == Some(ALREADY_APPLIED)
    }
}

/// Error body returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
