//! Integration tests for the SQLite stores on real database files
//!
//! These tests open the same file through several pools to stand in for
//! separate processes sharing one letter store.

#![allow(clippy::expect_used)]

use std::{collections::BTreeSet, sync::Arc};

use application::{
    AllocatorConfig, DraftCachePort, LetterRepositoryPort, ReferenceAllocator, ReservationOutcome,
};
use domain::{
    BranchCode, Draft, LetterContent, LocalId, NumberingScope, SequenceNumber, SyncStatus,
};
use futures::future::join_all;
use infrastructure::persistence::{
    AsyncDatabase, AsyncDatabaseConfig, SqliteDraftCache, SqliteLetterRepository,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn scope() -> NumberingScope {
    NumberingScope::new(BranchCode::new("RY").expect("code"), 2024).expect("scope")
}

fn n(value: u32) -> SequenceNumber {
    SequenceNumber::new(value).expect("positive")
}

async fn open(path: &std::path::Path) -> AsyncDatabase {
    AsyncDatabase::open(&AsyncDatabaseConfig::file(path))
        .await
        .expect("Failed to open database")
}

/// Reserve `1..=max` under throwaway keys
async fn seed_max(repo: &SqliteLetterRepository, max: u32) {
    for value in 1..=max {
        let outcome = repo
            .reserve(&scope(), n(value), LocalId::new())
            .await
            .expect("seed reservation");
        assert_eq!(outcome, ReservationOutcome::Reserved);
    }
}

// ============================================================================
// Draft Cache Durability
// ============================================================================

mod draft_cache_tests {
    use super::*;

    #[tokio::test]
    async fn saved_draft_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("drafts.db");

        let draft = Draft::new(
            scope(),
            LetterContent::new("Offer", "ACME Ltd", "Dear ACME,")
                .with_template("offer-v2")
                .with_field("amount", serde_json::json!(1200)),
        );

        let saved = {
            let db = open(&path).await;
            let cache = SqliteDraftCache::new(db.pool().clone());
            let saved = cache.put(draft).await.expect("put");
            db.close().await;
            saved
        };

        let db = open(&path).await;
        let cache = SqliteDraftCache::new(db.pool().clone());
        let loaded = cache.get(saved.local_id).await.expect("get");
        assert_eq!(loaded, Some(saved));
    }

    #[tokio::test]
    async fn assigned_number_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("drafts.db");

        let mut draft =
            Draft::new(scope(), LetterContent::new("Offer", "ACME Ltd", "Dear ACME,")).completed();
        draft.assign_sequence(n(44)).expect("assign");
        let local_id = draft.local_id;

        {
            let db = open(&path).await;
            SqliteDraftCache::new(db.pool().clone())
                .put(draft)
                .await
                .expect("put");
            db.close().await;
        }

        let db = open(&path).await;
        let pending = SqliteDraftCache::new(db.pool().clone())
            .list()
            .await
            .expect("list");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].local_id, local_id);
        assert_eq!(pending[0].sequence_number, Some(n(44)));
        assert_eq!(pending[0].sync_status, SyncStatus::Pending);
    }
}

// ============================================================================
// Letter Repository Uniqueness
// ============================================================================

mod letter_repository_tests {
    use super::*;

    #[tokio::test]
    async fn concurrent_allocations_are_consecutive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("letters.db");
        let seed = SqliteLetterRepository::new(open(&path).await.pool().clone());
        seed_max(&seed, 41).await;

        // One pool per simulated client
        let mut allocators = Vec::new();
        for _ in 0..8 {
            let db = open(&path).await;
            let repo: Arc<dyn LetterRepositoryPort> =
                Arc::new(SqliteLetterRepository::new(db.pool().clone()));
            allocators.push(ReferenceAllocator::new(
                repo,
                AllocatorConfig {
                    max_attempts: 20,
                    backoff_ms: 5,
                },
            ));
        }

        let numbers = join_all(
            allocators
                .iter()
                .map(|allocator| allocator.allocate(&scope(), LocalId::new())),
        )
        .await;

        let got: BTreeSet<u32> = numbers
            .into_iter()
            .map(|r| r.expect("allocation").get())
            .collect();
        let expected: BTreeSet<u32> = (42..=49).collect();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn two_finalizes_get_42_and_43() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("letters.db");
        let db = open(&path).await;
        let repo = Arc::new(SqliteLetterRepository::new(db.pool().clone()));
        seed_max(&repo, 41).await;

        let allocator = ReferenceAllocator::new(repo.clone(), AllocatorConfig::default());
        let (a, b) = tokio::join!(
            allocator.allocate(&scope(), LocalId::new()),
            allocator.allocate(&scope(), LocalId::new()),
        );

        let mut refs = [a.expect("a"), b.expect("b")]
            .map(|number| domain::ReferenceString::new(scope(), number).to_string());
        refs.sort();
        assert_eq!(refs, ["RY-42/2024", "RY-43/2024"]);
    }

    #[tokio::test]
    async fn letters_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("letters.db");
        let key = LocalId::new();

        let remote_id = {
            let db = open(&path).await;
            let repo = SqliteLetterRepository::new(db.pool().clone());
            repo.reserve(&scope(), n(1), key).await.expect("reserve");
            let outcome = repo
                .insert(
                    &domain::NewLetter {
                        scope: scope(),
                        sequence_number: n(1),
                        content: LetterContent::new("Offer", "ACME Ltd", "Dear ACME,"),
                    },
                    key,
                )
                .await
                .expect("insert");
            db.close().await;
            outcome.remote_id()
        };

        let repo = SqliteLetterRepository::new(open(&path).await.pool().clone());
        let letter = repo.find_letter(key).await.expect("find").expect("stored");
        assert_eq!(letter.remote_id, remote_id);
        assert_eq!(repo.query_max(&scope()).await.expect("max"), Some(n(1)));
    }
}
