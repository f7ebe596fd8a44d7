//! Letter repository configuration.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::adapters::HttpLetterRepositoryConfig;

/// Where the authoritative letter store lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryMode {
    /// A SQLite file shared by every client of this site
    #[default]
    Sqlite,
    /// A remote `letterdesk-server`
    Http,
}

impl fmt::Display for RepositoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Http => write!(f, "http"),
        }
    }
}

impl std::str::FromStr for RepositoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "http" => Ok(Self::Http),
            _ => Err(format!("Invalid repository mode: {s}. Use 'sqlite' or 'http'")),
        }
    }
}

/// Letter repository configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub mode: RepositoryMode,

    /// SQLite file of the letter store (`mode = "sqlite"`)
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,

    /// Maximum connections to the SQLite letter store
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Base URL of the letter server (`mode = "http"`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds (`mode = "http"`)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_sqlite_path() -> String {
    "letterdesk-letters.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            mode: RepositoryMode::default(),
            sqlite_path: default_sqlite_path(),
            max_connections: default_max_connections(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RepositoryConfig {
    #[must_use]
    pub fn to_http_config(&self) -> HttpLetterRepositoryConfig {
        HttpLetterRepositoryConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_str_case_insensitive() {
        assert_eq!("HTTP".parse::<RepositoryMode>().unwrap(), RepositoryMode::Http);
        assert_eq!("sqlite".parse::<RepositoryMode>().unwrap(), RepositoryMode::Sqlite);
        assert!("postgres".parse::<RepositoryMode>().is_err());
    }

    #[test]
    fn mode_deserialize() {
        let mode: RepositoryMode = serde_json::from_str("\"http\"").unwrap();
        assert_eq!(mode, RepositoryMode::Http);
    }

    #[test]
    fn http_config_uses_timeout() {
        let config = RepositoryConfig {
            timeout_secs: 3,
            ..Default::default()
        };
        assert_eq!(config.to_http_config().timeout, Duration::from_secs(3));
    }
}
