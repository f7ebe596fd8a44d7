//! Draft cache (SQLite) configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::default_true;
use crate::persistence::AsyncDatabaseConfig;

/// Local draft cache database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file holding cached drafts
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Maximum number of concurrent database connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Whether to run pending migrations on startup (default: true)
    #[serde(default = "default_true")]
    pub run_migrations: bool,

    /// Milliseconds to wait on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> String {
    "letterdesk-drafts.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            run_migrations: true,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    /// Pool settings for this database file
    #[must_use]
    pub fn to_async_config(&self) -> AsyncDatabaseConfig {
        pool_config(&self.path, self.max_connections, self.busy_timeout_ms)
    }
}

pub(crate) fn pool_config(path: &str, max_connections: u32, busy_timeout_ms: u64) -> AsyncDatabaseConfig {
    let mut config = AsyncDatabaseConfig::file(path).with_max_connections(max_connections);
    config.busy_timeout = Duration::from_millis(busy_timeout_ms);
    config
}
