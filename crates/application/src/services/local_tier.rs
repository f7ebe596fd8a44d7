//! Local draft tier
//!
//! Wraps the durable draft cache. When the durable cache fails with a
//! storage error, the tier switches to an in-memory cache for the rest of
//! the session and warns the author that drafts will not survive a reload.
//! Reads merge both tiers so nothing saved before the switch disappears.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use domain::{Draft, LocalId, Notification};
use tracing::{debug, instrument, warn};

use super::Notifier;
use crate::{
    error::ApplicationError,
    ports::{DraftCachePort, InMemoryDraftCache, sort_oldest_first},
};

pub struct LocalDraftTier {
    durable: Arc<dyn DraftCachePort>,
    session: InMemoryDraftCache,
    degraded: AtomicBool,
    notifier: Notifier,
}

impl std::fmt::Debug for LocalDraftTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDraftTier")
            .field("degraded", &self.is_degraded())
            .finish_non_exhaustive()
    }
}

impl LocalDraftTier {
    pub fn new(durable: Arc<dyn DraftCachePort>, notifier: Notifier) -> Self {
        Self {
            durable,
            session: InMemoryDraftCache::new(),
            degraded: AtomicBool::new(false),
            notifier,
        }
    }

    /// Whether drafts are currently kept in memory only
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn degrade(&self, err: &ApplicationError) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            warn!(error = %err, "Draft cache unavailable, keeping drafts in memory");
            self.notifier.publish(Notification::warning(
                "Drafts cannot be saved on this device right now. They are kept in memory \
                 and will be lost if the application is closed.",
            ));
        }
    }

    /// Run `op` against the durable cache
    ///
    /// `None` means the durable cache is unavailable.
    async fn durable<T, F, Fut>(&self, op: F) -> Result<Option<T>, ApplicationError>
    where
        F: FnOnce(Arc<dyn DraftCachePort>) -> Fut,
        Fut: std::future::Future<Output = Result<T, ApplicationError>>,
    {
        match op(Arc::clone(&self.durable)).await {
            Ok(value) => Ok(Some(value)),
            Err(err @ ApplicationError::Storage(_)) => {
                self.degrade(&err);
                Ok(None)
            },
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, draft), fields(local_id = %draft.local_id))]
    pub async fn put(&self, draft: Draft) -> Result<Draft, ApplicationError> {
        if !self.is_degraded() {
            let attempt = draft.clone();
            if let Some(stored) = self.durable(|cache| async move { cache.put(attempt).await }).await? {
                return Ok(stored);
            }
        }
        debug!("Saving draft to session cache");
        self.session.put(draft).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, local_id: LocalId) -> Result<Option<Draft>, ApplicationError> {
        if let Some(draft) = self.session.get(local_id).await? {
            return Ok(Some(draft));
        }
        Ok(self
            .durable(|cache| async move { cache.get(local_id).await })
            .await?
            .flatten())
    }

    /// All drafts, oldest first; session entries shadow durable ones
    pub async fn list(&self) -> Result<Vec<Draft>, ApplicationError> {
        let mut merged: HashMap<LocalId, Draft> = self
            .durable(|cache| async move { cache.list().await })
            .await?
            .unwrap_or_default()
            .into_iter()
            .map(|d| (d.local_id, d))
            .collect();
        for draft in self.session.list().await? {
            merged.insert(draft.local_id, draft);
        }
        let mut drafts: Vec<Draft> = merged.into_values().collect();
        sort_oldest_first(&mut drafts);
        Ok(drafts)
    }

    /// All drafts, most recently saved first
    pub async fn list_for_display(&self) -> Result<Vec<Draft>, ApplicationError> {
        let mut drafts = self.list().await?;
        drafts.reverse();
        Ok(drafts)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, local_id: LocalId) -> Result<bool, ApplicationError> {
        let in_session = self.session.delete(local_id).await?;
        let in_durable = self
            .durable(|cache| async move { cache.delete(local_id).await })
            .await?
            .unwrap_or(false);
        Ok(in_session || in_durable)
    }
}

#[cfg(test)]
mod tests {
    use domain::{BranchCode, LetterContent, NotificationKind, NumberingScope};

    use super::*;
    use crate::ports::MockDraftCachePort;

    fn draft(subject: &str) -> Draft {
        let scope = NumberingScope::new(BranchCode::new("RY").unwrap(), 2024).unwrap();
        Draft::new(scope, LetterContent::new(subject, "ACME", "Body"))
    }

    #[tokio::test]
    async fn healthy_cache_is_used_directly() {
        let durable = Arc::new(InMemoryDraftCache::new());
        let tier = LocalDraftTier::new(durable.clone(), Notifier::default());
        let stored = tier.put(draft("a")).await.unwrap();

        assert!(!tier.is_degraded());
        assert!(durable.get(stored.local_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn storage_failure_degrades_to_memory_and_warns() {
        let mut durable = MockDraftCachePort::new();
        durable
            .expect_put()
            .times(1)
            .returning(|_| Err(ApplicationError::Storage("database is locked".into())));
        durable
            .expect_list()
            .returning(|| Err(ApplicationError::Storage("database is locked".into())));

        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        let tier = LocalDraftTier::new(Arc::new(durable), notifier);

        let first = tier.put(draft("a")).await.unwrap();
        let second = tier.put(draft("b")).await.unwrap();

        assert!(tier.is_degraded());
        assert_eq!(tier.get(first.local_id).await.unwrap().unwrap(), first);
        assert_eq!(tier.list().await.unwrap().len(), 2);
        assert!(tier.get(second.local_id).await.unwrap().is_some());

        let warning = rx.recv().await.unwrap();
        assert_eq!(warning.kind, NotificationKind::Warning);
        assert!(rx.try_recv().is_err(), "warning is raised once per session");
    }

    #[tokio::test]
    async fn validation_errors_do_not_degrade() {
        let tier = LocalDraftTier::new(Arc::new(InMemoryDraftCache::new()), Notifier::default());
        let mut bad = draft("a");
        bad.sync_status = domain::SyncStatus::Synced;

        assert!(tier.put(bad).await.is_err());
        assert!(!tier.is_degraded());
    }

    #[tokio::test]
    async fn list_merges_tiers_after_degrading() {
        let durable = Arc::new(InMemoryDraftCache::new());
        let before = durable.put(draft("saved before failure")).await.unwrap();

        let tier = LocalDraftTier::new(durable, Notifier::default());
        tier.degrade(&ApplicationError::Storage("disk full".into()));
        let after = tier.put(draft("saved after failure")).await.unwrap();

        let ids: Vec<_> = tier.list().await.unwrap().iter().map(|d| d.local_id).collect();
        assert_eq!(ids, vec![before.local_id, after.local_id]);
        assert!(tier.get(before.local_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn display_order_is_newest_first() {
        let tier = LocalDraftTier::new(Arc::new(InMemoryDraftCache::new()), Notifier::default());
        let older = tier.put(draft("older")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let newer = tier.put(draft("newer")).await.unwrap();

        let ids: Vec<_> = tier
            .list_for_display()
            .await
            .unwrap()
            .iter()
            .map(|d| d.local_id)
            .collect();
        assert_eq!(ids, vec![newer.local_id, older.local_id]);
    }

    #[tokio::test]
    async fn delete_removes_from_both_tiers() {
        let tier = LocalDraftTier::new(Arc::new(InMemoryDraftCache::new()), Notifier::default());
        let stored = tier.put(draft("a")).await.unwrap();
        assert!(tier.delete(stored.local_id).await.unwrap());
        assert!(tier.get(stored.local_id).await.unwrap().is_none());
        assert!(!tier.delete(stored.local_id).await.unwrap());
    }
}
