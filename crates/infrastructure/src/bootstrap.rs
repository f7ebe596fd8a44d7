//! Wiring of the author-side runtime
//!
//! Builds the draft cache, the letter repository adapter selected by
//! configuration, the connectivity monitor and the sync coordinator, and
//! owns the background tasks (probe loop, reconnect watcher).

use std::sync::Arc;

use application::{
    ApplicationError, BranchDirectoryPort, ConnectivityMonitor, DraftCachePort,
    InMemoryDraftCache, LetterRepositoryPort, LocalDraftTier, Notifier, ReferenceAllocator,
    RemoteLetterTier, ResyncReport, SyncCoordinator,
};
use domain::Notification;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::{
    adapters::{ConfigBranchDirectory, HttpLetterRepository},
    config::{AppConfig, RepositoryConfig, RepositoryMode, pool_config},
    persistence::{AsyncDatabase, AsyncDatabaseError, SqliteDraftCache, SqliteLetterRepository},
};

const LETTER_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Errors raised while wiring the runtime
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Letter store: {0}")]
    Database(#[from] AsyncDatabaseError),

    #[error(transparent)]
    Application(#[from] ApplicationError),
}

/// Open the authoritative letter store selected by `config`
///
/// The returned database handle is `Some` for the SQLite mode so the
/// caller can close it on shutdown.
#[instrument(skip_all, fields(mode = %config.mode))]
pub async fn open_letter_repository(
    config: &RepositoryConfig,
) -> Result<(Arc<dyn LetterRepositoryPort>, Option<AsyncDatabase>), BootstrapError> {
    match config.mode {
        RepositoryMode::Sqlite => {
            let db = AsyncDatabase::open(&pool_config(
                &config.sqlite_path,
                config.max_connections,
                LETTER_STORE_BUSY_TIMEOUT_MS,
            ))
            .await?;
            let repository = SqliteLetterRepository::new(db.pool().clone());
            Ok((Arc::new(repository), Some(db)))
        },
        RepositoryMode::Http => {
            let repository = HttpLetterRepository::new(config.to_http_config())?;
            info!(base_url = repository.base_url(), "Using remote letter server");
            Ok((Arc::new(repository), None))
        },
    }
}

/// Author-side runtime
pub struct LetterDesk {
    coordinator: SyncCoordinator,
    repository: Arc<dyn LetterRepositoryPort>,
    databases: Vec<AsyncDatabase>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for LetterDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LetterDesk")
            .field("coordinator", &self.coordinator)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl LetterDesk {
    /// Build every component from configuration
    ///
    /// A draft cache that cannot be opened does not abort startup: drafts
    /// are kept in memory for the session and a warning is published.
    pub async fn build(config: &AppConfig) -> Result<Self, BootstrapError> {
        let directory: Arc<dyn BranchDirectoryPort> =
            Arc::new(ConfigBranchDirectory::from_entries(&config.branches)?);
        let (repository, letters_db) = open_letter_repository(&config.repository).await?;

        let notifier = Notifier::default();
        let mut databases: Vec<AsyncDatabase> = letters_db.into_iter().collect();

        let durable: Arc<dyn DraftCachePort> =
            match open_draft_cache(config).await {
                Ok(db) => {
                    let cache = SqliteDraftCache::new(db.pool().clone());
                    databases.push(db);
                    Arc::new(cache)
                },
                Err(e) => {
                    warn!(error = %e, path = %config.database.path, "Draft cache unavailable");
                    notifier.publish(Notification::warning(
                        "Drafts cannot be saved on this device right now. They are kept in \
                         memory and will be lost if the application is closed.",
                    ));
                    Arc::new(InMemoryDraftCache::new())
                },
            };

        let monitor = Arc::new(ConnectivityMonitor::new(
            repository.clone(),
            config.connectivity.clone(),
        ));
        let allocator = ReferenceAllocator::new(repository.clone(), config.allocator.clone());
        let coordinator = SyncCoordinator::new(
            LocalDraftTier::new(durable, notifier.clone()),
            RemoteLetterTier::new(repository.clone(), allocator, monitor),
            directory,
            notifier,
            config.retry.to_retry_config(),
            config.sync.to_sync_config(),
        );

        Ok(Self {
            coordinator,
            repository,
            databases,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        })
    }

    pub const fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    pub fn repository(&self) -> &Arc<dyn LetterRepositoryPort> {
        &self.repository
    }

    /// Probe once, then start the probe loop and the reconnect watcher
    ///
    /// Returns the outcome of the initial resync pass over pending drafts.
    pub async fn start(&mut self) -> Result<ResyncReport, ApplicationError> {
        let monitor = self.coordinator.monitor().clone();
        let initial = monitor.probe().await;
        info!(connectivity = ?initial, "Initial reachability probe");

        self.tasks
            .push(tokio::spawn(monitor.run(self.cancel.child_token())));
        self.tasks.push(
            self.coordinator
                .spawn_reconnect_watcher(self.cancel.child_token()),
        );

        self.coordinator.resync_pending().await
    }

    /// Stop background tasks and in-flight submissions, then close databases
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.coordinator.shutdown();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        for db in self.databases {
            db.close().await;
        }
        info!("Letter desk stopped");
    }
}

async fn open_draft_cache(config: &AppConfig) -> Result<AsyncDatabase, AsyncDatabaseError> {
    let db = AsyncDatabase::new(&config.database.to_async_config()).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }
    Ok(db)
}

#[cfg(test)]
mod tests {
    use domain::{BranchId, LetterContent, SyncStatus};

    use super::*;
    use crate::config::BranchEntry;

    fn config(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.database.path = dir.join("drafts.db").display().to_string();
        config.repository.sqlite_path = dir.join("letters.db").display().to_string();
        config.retry.jitter = false;
        config.retry.initial_delay_ms = 1;
        config.branches = vec![BranchEntry {
            id: "riyadh".into(),
            code: "RY".into(),
        }];
        config
    }

    #[tokio::test]
    async fn finalizes_against_local_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut desk = LetterDesk::build(&config(dir.path())).await.unwrap();
        assert!(desk.start().await.unwrap().is_empty());

        let author = application::AuthorContext::new(BranchId::new("riyadh").unwrap(), 2024);
        let draft = desk
            .coordinator()
            .create_draft(&author, LetterContent::new("Offer", "ACME Ltd", "Dear ACME,"))
            .await
            .unwrap();

        let outcome = desk.coordinator().finalize(draft.completed()).await.unwrap();
        assert!(outcome.is_synced());
        assert_eq!(
            outcome.draft().reference().unwrap().to_string(),
            "RY-1/2024"
        );
        assert_eq!(outcome.draft().sync_status, SyncStatus::Synced);

        desk.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_cache_directory_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.database.path = dir.path().join("missing/dir/drafts.db").display().to_string();

        let desk = LetterDesk::build(&config).await.unwrap();

        let author = application::AuthorContext::new(BranchId::new("riyadh").unwrap(), 2024);
        let draft = desk
            .coordinator()
            .create_draft(&author, LetterContent::new("Offer", "ACME Ltd", "Dear ACME,"))
            .await
            .unwrap();
        assert!(
            desk.coordinator()
                .local()
                .get(draft.local_id)
                .await
                .unwrap()
                .is_some()
        );

        desk.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_branch_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.branches.push(BranchEntry {
            id: "jeddah".into(),
            code: "J-D".into(),
        });
        let err = LetterDesk::build(&config).await.unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::Application(ApplicationError::Configuration(_))
        ));
    }
}
