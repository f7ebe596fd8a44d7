//! Remote letter tier
//!
//! Pairs the reference allocator with the letter repository and owns the
//! connectivity gate: while the monitor reports the repository offline,
//! every call fails fast with [`ApplicationError::Offline`] instead of
//! touching the network.

use std::sync::Arc;

use domain::{LocalId, NewLetter, NumberingScope, SequenceNumber};
use tracing::instrument;

use super::{ConnectivityMonitor, ReferenceAllocator};
use crate::{
    error::ApplicationError,
    ports::{InsertOutcome, LetterRepositoryPort},
};

pub struct RemoteLetterTier {
    repository: Arc<dyn LetterRepositoryPort>,
    allocator: ReferenceAllocator,
    monitor: Arc<ConnectivityMonitor>,
}

impl std::fmt::Debug for RemoteLetterTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLetterTier")
            .field("allocator", &self.allocator)
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}

impl RemoteLetterTier {
    pub fn new(
        repository: Arc<dyn LetterRepositoryPort>,
        allocator: ReferenceAllocator,
        monitor: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            repository,
            allocator,
            monitor,
        }
    }

    pub const fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    pub fn is_offline(&self) -> bool {
        self.monitor.is_offline()
    }

    fn gate(&self) -> Result<(), ApplicationError> {
        if self.is_offline() {
            return Err(ApplicationError::Offline(
                "letter repository is unreachable".into(),
            ));
        }
        Ok(())
    }

    /// Allocate a sequence number for `key`
    #[instrument(skip(self), fields(scope = %scope, key = %key))]
    pub async fn allocate(
        &self,
        scope: &NumberingScope,
        key: LocalId,
    ) -> Result<SequenceNumber, ApplicationError> {
        self.gate()?;
        self.allocator.allocate(scope, key).await
    }

    /// Idempotently store `letter` under `key`
    #[instrument(skip(self, letter), fields(reference = %letter.reference(), key = %key))]
    pub async fn submit(
        &self,
        letter: &NewLetter,
        key: LocalId,
    ) -> Result<InsertOutcome, ApplicationError> {
        self.gate()?;
        self.repository.insert(letter, key).await
    }
}

#[cfg(test)]
mod tests {
    use domain::{BranchCode, LetterContent};

    use super::*;
    use crate::{
        ports::MockLetterRepositoryPort,
        services::{AllocatorConfig, Connectivity, ConnectivityConfig},
        testing::FakeLetterRepository,
    };

    fn scope() -> NumberingScope {
        NumberingScope::new(BranchCode::new("RY").unwrap(), 2024).unwrap()
    }

    fn tier(repo: Arc<dyn LetterRepositoryPort>) -> RemoteLetterTier {
        let monitor = Arc::new(ConnectivityMonitor::new(Arc::clone(&repo), ConnectivityConfig::default()));
        let allocator = ReferenceAllocator::new(Arc::clone(&repo), AllocatorConfig::default());
        RemoteLetterTier::new(repo, allocator, monitor)
    }

    #[tokio::test]
    async fn offline_gate_prevents_any_repository_call() {
        // A mock with no expectations panics if called
        let remote = tier(Arc::new(MockLetterRepositoryPort::new()));
        remote.monitor().set(Connectivity::Offline);

        let err = remote.allocate(&scope(), LocalId::new()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Offline(_)));

        let letter = NewLetter {
            scope: scope(),
            sequence_number: SequenceNumber::FIRST,
            content: LetterContent::new("s", "r", "b"),
        };
        let err = remote.submit(&letter, LocalId::new()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Offline(_)));
    }

    #[tokio::test]
    async fn allocate_then_submit() {
        let repo = Arc::new(FakeLetterRepository::new());
        let remote = tier(repo.clone());
        let key = LocalId::new();

        let n = remote.allocate(&scope(), key).await.unwrap();
        let letter = NewLetter {
            scope: scope(),
            sequence_number: n,
            content: LetterContent::new("s", "r", "b"),
        };
        let first = remote.submit(&letter, key).await.unwrap();
        let second = remote.submit(&letter, key).await.unwrap();

        assert!(first.was_created());
        assert_eq!(second, InsertOutcome::AlreadyApplied(first.remote_id()));
        assert_eq!(repo.letters_for(key), 1);
    }
}
