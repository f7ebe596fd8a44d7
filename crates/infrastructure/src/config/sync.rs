//! Draft synchronization configuration.

use application::{AutosaveConfig, SyncConfig};
use serde::{Deserialize, Serialize};

/// Autosave timing and cache retention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAppConfig {
    /// Seconds between periodic autosaves
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: u64,

    /// Quiet period after a significant edit, in milliseconds
    #[serde(default = "default_autosave_debounce")]
    pub autosave_debounce_ms: u64,

    /// Keep synced drafts in the cache instead of deleting them
    #[serde(default)]
    pub retain_synced: bool,
}

const fn default_autosave_interval() -> u64 {
    60
}

const fn default_autosave_debounce() -> u64 {
    1500
}

impl Default for SyncAppConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs: default_autosave_interval(),
            autosave_debounce_ms: default_autosave_debounce(),
            retain_synced: false,
        }
    }
}

impl SyncAppConfig {
    #[must_use]
    pub const fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            retain_synced: self.retain_synced,
            autosave: AutosaveConfig {
                interval_secs: self.autosave_interval_secs,
                debounce_ms: self.autosave_debounce_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_coordinator_defaults() {
        assert_eq!(SyncAppConfig::default().to_sync_config(), SyncConfig::default());
    }

    #[test]
    fn partial_table_keeps_defaults() {
        let config: SyncAppConfig = serde_json::from_str(r#"{"retain_synced": true}"#).unwrap();
        assert!(config.retain_synced);
        assert_eq!(config.autosave_interval_secs, 60);
    }
}
