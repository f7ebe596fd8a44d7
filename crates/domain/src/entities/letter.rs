//! Repository-side records: reservations and finalized letters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LetterContent;
use crate::value_objects::{LocalId, NumberingScope, ReferenceString, RemoteId, SequenceNumber};

/// A sequence number claimed for one idempotency key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub scope: NumberingScope,
    pub sequence_number: SequenceNumber,
    pub idempotency_key: LocalId,
    pub reserved_at: DateTime<Utc>,
}

impl Reservation {
    pub fn reference(&self) -> ReferenceString {
        ReferenceString::new(self.scope.clone(), self.sequence_number)
    }
}

/// Payload submitted to the letter repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLetter {
    pub scope: NumberingScope,
    pub sequence_number: SequenceNumber,
    pub content: LetterContent,
}

impl NewLetter {
    pub fn reference(&self) -> ReferenceString {
        ReferenceString::new(self.scope.clone(), self.sequence_number)
    }
}

/// A letter stored permanently in the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedLetter {
    pub remote_id: RemoteId,
    pub scope: NumberingScope,
    pub sequence_number: SequenceNumber,
    pub content: LetterContent,
    /// Local id of the draft this letter was created from
    pub idempotency_key: LocalId,
    pub created_at: DateTime<Utc>,
}

impl FinalizedLetter {
    pub fn from_new(
        letter: NewLetter,
        remote_id: RemoteId,
        idempotency_key: LocalId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            remote_id,
            scope: letter.scope,
            sequence_number: letter.sequence_number,
            content: letter.content,
            idempotency_key,
            created_at,
        }
    }

    pub fn reference(&self) -> ReferenceString {
        ReferenceString::new(self.scope.clone(), self.sequence_number)
    }
}
