//! Infrastructure layer - Adapters for external systems
//!
//! Implements the ports defined in the application layer: SQLite draft
//! cache and letter repository, HTTP letter repository client and the
//! config-backed branch directory. Also owns configuration loading,
//! logging setup and the wiring of the author-side runtime.

pub mod adapters;
pub mod bootstrap;
pub mod config;
pub mod persistence;
pub mod telemetry;

pub use adapters::{ConfigBranchDirectory, HttpLetterRepository, HttpLetterRepositoryConfig};
pub use bootstrap::{BootstrapError, LetterDesk, open_letter_repository};
pub use config::{
    AppConfig, BranchEntry, DatabaseConfig, Environment, RepositoryConfig, RepositoryMode,
    RetryAppConfig, ServerConfig, SyncAppConfig, TelemetryAppConfig,
};
pub use persistence::{
    AsyncDatabase, AsyncDatabaseConfig, AsyncDatabaseError, SqliteDraftCache,
    SqliteLetterRepository,
};
pub use telemetry::{TelemetryError, init_logging};
