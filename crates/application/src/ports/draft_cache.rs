//! Local draft cache port
//!
//! The cache holds drafts that have not been confirmed by the letter
//! repository. It is single-process: nothing here coordinates between two
//! applications writing the same cache file.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use domain::{Draft, LocalId};
#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;

use crate::error::ApplicationError;

/// Port for client-local draft persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DraftCachePort: Send + Sync {
    /// Insert or overwrite a draft by its local id
    ///
    /// Refreshes `last_saved` and resets the sync status to `pending` unless
    /// the draft is synced. A single `put` is atomic: readers observe either
    /// the previous or the new version, never a mix.
    ///
    /// # Returns
    /// The draft as stored
    async fn put(&self, draft: Draft) -> Result<Draft, ApplicationError>;

    /// Get a draft by local id
    async fn get(&self, local_id: LocalId) -> Result<Option<Draft>, ApplicationError>;

    /// List every cached draft, oldest `last_saved` first
    ///
    /// Ties are broken by local id so the order is stable.
    async fn list(&self) -> Result<Vec<Draft>, ApplicationError>;

    /// Remove a draft
    ///
    /// # Returns
    /// true if the draft existed
    async fn delete(&self, local_id: LocalId) -> Result<bool, ApplicationError>;
}

/// Session-only draft cache
///
/// Nothing survives the process. Used when durable storage is unavailable
/// and in tests.
#[derive(Debug, Default)]
pub struct InMemoryDraftCache {
    drafts: RwLock<HashMap<LocalId, Draft>>,
}

impl InMemoryDraftCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.drafts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.read().is_empty()
    }
}

#[async_trait]
impl DraftCachePort for InMemoryDraftCache {
    async fn put(&self, draft: Draft) -> Result<Draft, ApplicationError> {
        let stored = draft.prepared_for_cache(Utc::now())?;
        self.drafts.write().insert(stored.local_id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, local_id: LocalId) -> Result<Option<Draft>, ApplicationError> {
        Ok(self.drafts.read().get(&local_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Draft>, ApplicationError> {
        let mut drafts: Vec<Draft> = self.drafts.read().values().cloned().collect();
        sort_oldest_first(&mut drafts);
        Ok(drafts)
    }

    async fn delete(&self, local_id: LocalId) -> Result<bool, ApplicationError> {
        Ok(self.drafts.write().remove(&local_id).is_some())
    }
}

/// Cache listing order: `last_saved` ascending, then local id
pub fn sort_oldest_first(drafts: &mut [Draft]) {
    drafts.sort_by(|a, b| {
        a.last_saved
            .cmp(&b.last_saved)
            .then_with(|| a.local_id.cmp(&b.local_id))
    });
}
