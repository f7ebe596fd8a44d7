//! Application configuration
//!
//! Split into focused sub-modules:
//! - `server`: HTTP server settings
//! - `database`: local draft cache (SQLite)
//! - `repository`: authoritative letter store (SQLite file or HTTP server)
//! - `resilience`: telemetry and retry
//! - `sync`: autosave timing and cache retention
//!
//! Sources, lowest priority first: built-in defaults, an optional
//! `config.toml`, then `LETTERDESK_*` environment variables with `__`
//! between nested keys (e.g. `LETTERDESK_REPOSITORY__MODE=http`).

mod database;
mod repository;
mod resilience;
mod server;
mod sync;

use std::{fmt, path::Path};

use application::{AllocatorConfig, ConnectivityConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use database::DatabaseConfig;
pub use repository::{RepositoryConfig, RepositoryMode};
pub use resilience::{RetryAppConfig, TelemetryAppConfig};
pub use server::ServerConfig;
pub use sync::SyncAppConfig;

pub(crate) use database::pool_config;

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "LETTERDESK";

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Application environment (development or production)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment - internal error details are exposed
    #[default]
    Development,
    /// Production environment - internal errors are sanitized
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!(
                "Invalid environment: {s}. Use 'development' or 'production'"
            )),
        }
    }
}

/// One row of the `[[branches]]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchEntry {
    /// Branch identifier used by authors
    pub id: String,
    /// Short code printed in references
    pub code: String,
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    /// Local draft cache
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authoritative letter store
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Retry policy for repository calls
    #[serde(default)]
    pub retry: RetryAppConfig,

    #[serde(default)]
    pub allocator: AllocatorConfig,

    #[serde(default)]
    pub connectivity: ConnectivityConfig,

    #[serde(default)]
    pub sync: SyncAppConfig,

    /// Server configuration (`letterdesk-server` only)
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub telemetry: TelemetryAppConfig,

    /// Branch id to code mapping
    #[serde(default)]
    pub branches: Vec<BranchEntry>,
}

impl AppConfig {
    /// Load configuration from `config.toml` (if present) and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, reading `file` instead of `config.toml`
    ///
    /// An explicitly named file must exist.
    pub fn load_from(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("config").required(false),
        };

        let builder = config::Config::builder()
            // Start with defaults
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("repository.mode", "sqlite")?
            // Load from file if exists
            .add_source(file_source)
            // Override with environment variables (e.g., LETTERDESK_SERVER__PORT)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work together
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.repository.mode == RepositoryMode::Http && self.repository.base_url.is_empty() {
            return Err(config::ConfigError::Message(
                "repository.base_url is required when repository.mode = \"http\"".into(),
            ));
        }
        if self.allocator.max_attempts == 0 {
            return Err(config::ConfigError::Message(
                "allocator.max_attempts must be at least 1".into(),
            ));
        }
        if self.sync.autosave_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "sync.autosave_interval_secs must be at least 1".into(),
            ));
        }
        if self.branches.is_empty() {
            warn!("No branches configured; drafts cannot be created");
        }
        Ok(())
    }

    pub const fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }
}
