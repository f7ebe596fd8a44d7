//! Draft entity
//!
//! A draft lives in the author's local cache from the first edit until the
//! letter repository confirms it. Its `local_id` is the idempotency key for
//! every remote operation performed on its behalf.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::LetterContent;
use crate::{
    errors::DomainError,
    value_objects::{
        DraftStatus, LocalId, NumberingScope, ReferenceString, RemoteId, SequenceNumber,
        SyncStatus,
    },
};

/// A letter in progress or awaiting submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Client-generated identifier, stable for the draft's lifetime
    pub local_id: LocalId,
    /// Assigned by the repository once synced
    pub remote_id: Option<RemoteId>,
    /// Branch and year the letter will be numbered in
    pub scope: NumberingScope,
    /// Allocated sequence number, if any
    pub sequence_number: Option<SequenceNumber>,
    pub content: LetterContent,
    pub status: DraftStatus,
    pub sync_status: SyncStatus,
    /// Last time the draft was written to the cache
    pub last_saved: DateTime<Utc>,
}

impl Draft {
    /// Start a new draft in the given scope
    pub fn new(scope: NumberingScope, content: LetterContent) -> Self {
        Self::with_local_id(LocalId::new(), scope, content)
    }

    /// Start a draft with a known local id
    pub fn with_local_id(local_id: LocalId, scope: NumberingScope, content: LetterContent) -> Self {
        Self {
            local_id,
            remote_id: None,
            scope,
            sequence_number: None,
            content,
            status: DraftStatus::Draft,
            sync_status: SyncStatus::Pending,
            last_saved: truncate_to_micros(Utc::now()),
        }
    }

    /// Mark the draft as ready for finalization
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.status = DraftStatus::Completed;
        self
    }

    /// Replace the content, keeping identity and numbering
    pub fn edit(&mut self, content: LetterContent) {
        self.content = content;
    }

    pub fn is_completed(&self) -> bool {
        self.status == DraftStatus::Completed
    }

    pub fn is_synced(&self) -> bool {
        self.sync_status == SyncStatus::Synced
    }

    /// Completed, not yet confirmed by the repository
    pub fn awaits_sync(&self) -> bool {
        self.is_completed() && !self.is_synced()
    }

    /// Check the draft can be finalized, without touching any storage
    pub fn validate_for_finalize(&self) -> Result<(), DomainError> {
        if !self.is_completed() {
            return Err(DomainError::validation(format!(
                "draft {} is not completed (status: {})",
                self.local_id, self.status
            )));
        }
        self.content.ensure_complete()
    }

    /// Record the allocated sequence number
    ///
    /// Re-assigning the same number is a no-op; a different number means the
    /// allocator broke its idempotency contract.
    pub fn assign_sequence(&mut self, number: SequenceNumber) -> Result<(), DomainError> {
        match self.sequence_number {
            Some(existing) if existing != number => Err(DomainError::NotPermitted(format!(
                "draft {} already holds sequence number {existing}, refusing {number}",
                self.local_id
            ))),
            _ => {
                self.sequence_number = Some(number);
                Ok(())
            },
        }
    }

    /// Record the repository confirmation
    pub fn mark_synced(&mut self, remote_id: RemoteId) -> Result<(), DomainError> {
        if self.sequence_number.is_none() {
            return Err(DomainError::NotPermitted(format!(
                "draft {} cannot be synced without a sequence number",
                self.local_id
            )));
        }
        self.remote_id = Some(remote_id);
        self.sync_status = SyncStatus::Synced;
        Ok(())
    }

    /// Reference string, once a number has been allocated
    pub fn reference(&self) -> Option<ReferenceString> {
        self.sequence_number
            .map(|n| ReferenceString::new(self.scope.clone(), n))
    }

    /// `synced` iff a remote id is present
    pub fn is_consistent(&self) -> bool {
        self.is_synced() == self.remote_id.is_some()
    }

    /// Normalize the draft for a cache write at `now`
    ///
    /// Refreshes `last_saved` and resets the sync status to `pending` unless
    /// the draft is synced.
    pub fn prepared_for_cache(mut self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.remote_id.is_some() && !self.is_synced() {
            return Err(DomainError::validation(format!(
                "draft {} has a remote id but is marked {}",
                self.local_id, self.sync_status
            )));
        }
        if self.is_synced() && self.remote_id.is_none() {
            return Err(DomainError::validation(format!(
                "draft {} is marked synced without a remote id",
                self.local_id
            )));
        }
        if !self.is_synced() {
            self.sync_status = SyncStatus::Pending;
        }
        self.last_saved = truncate_to_micros(now);
        Ok(self)
    }
}

/// Cache timestamps are kept at microsecond precision
pub fn truncate_to_micros(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}
