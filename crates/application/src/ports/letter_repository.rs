//! Letter repository port
//!
//! The letter repository is the authoritative store and the only place
//! where numbering uniqueness is enforced. Reservations claim a
//! `(branch, year, number)` triple for one idempotency key; inserts are
//! idempotent on the same key.

use async_trait::async_trait;
use domain::{
    FinalizedLetter, LocalId, NewLetter, NumberingScope, RemoteId, Reservation, SequenceNumber,
};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;

/// Result of trying to claim a sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReservationOutcome {
    /// The number now belongs to the key
    Reserved,
    /// Another key holds the number
    Taken,
    /// The key already holds a number in this scope
    Held { sequence_number: SequenceNumber },
}

/// Result of an idempotent insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new letter was stored
    Created(RemoteId),
    /// A letter with the same idempotency key already exists
    AlreadyApplied(RemoteId),
}

impl InsertOutcome {
    pub const fn remote_id(self) -> RemoteId {
        match self {
            Self::Created(id) | Self::AlreadyApplied(id) => id,
        }
    }

    pub const fn was_created(self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Port for the authoritative letter store
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LetterRepositoryPort: Send + Sync {
    /// Highest number reserved or stored in the scope
    async fn query_max(
        &self,
        scope: &NumberingScope,
    ) -> Result<Option<SequenceNumber>, ApplicationError>;

    /// Claim `number` in `scope` for `key`
    ///
    /// Must be decided by the store's uniqueness constraint, not by a prior
    /// read, so two concurrent callers can never both get `Reserved`.
    async fn reserve(
        &self,
        scope: &NumberingScope,
        number: SequenceNumber,
        key: LocalId,
    ) -> Result<ReservationOutcome, ApplicationError>;

    /// Reservation held by `key`, if any
    async fn find_reservation(&self, key: LocalId)
    -> Result<Option<Reservation>, ApplicationError>;

    /// Store a letter under a reservation held by `key`
    ///
    /// Repeating the call with the same key returns
    /// [`InsertOutcome::AlreadyApplied`] with the original remote id.
    async fn insert(
        &self,
        letter: &NewLetter,
        key: LocalId,
    ) -> Result<InsertOutcome, ApplicationError>;

    /// Letter stored under `key`, if any
    async fn find_letter(&self, key: LocalId) -> Result<Option<FinalizedLetter>, ApplicationError>;

    /// Cheap reachability check
    async fn ping(&self) -> Result<(), ApplicationError>;
}
