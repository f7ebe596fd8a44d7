//! Resilience and observability configurations: Telemetry, Retry.

use application::RetryConfig;
use serde::{Deserialize, Serialize};

use super::default_true;

// ==============================
// Telemetry Configuration
// ==============================

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryAppConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info,sqlx=warn".to_string()
}

impl Default for TelemetryAppConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            json: false,
        }
    }
}

// ==============================
// Retry Configuration
// ==============================

/// Retry configuration for letter repository calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryAppConfig {
    /// Initial delay before first retry in milliseconds (default: 500ms)
    #[serde(default = "default_retry_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds (default: 30s)
    #[serde(default = "default_retry_max_delay")]
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_retry_multiplier")]
    pub multiplier: f64,

    /// Maximum number of retry attempts (default: 5)
    #[serde(default = "default_retry_max_retries")]
    pub max_retries: u32,

    /// Spread out clients that reconnect at the same moment
    #[serde(default = "default_true")]
    pub jitter: bool,
}

const fn default_retry_initial_delay() -> u64 {
    500
}

const fn default_retry_max_delay() -> u64 {
    30_000
}

const fn default_retry_multiplier() -> f64 {
    2.0
}

const fn default_retry_max_retries() -> u32 {
    5
}

impl Default for RetryAppConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_retry_initial_delay(),
            max_delay_ms: default_retry_max_delay(),
            multiplier: default_retry_multiplier(),
            max_retries: default_retry_max_retries(),
            jitter: true,
        }
    }
}

impl RetryAppConfig {
    /// Convert to `RetryConfig` for use with retry operations
    #[must_use]
    pub const fn to_retry_config(&self) -> RetryConfig {
        let config = RetryConfig::new(
            self.initial_delay_ms,
            self.max_delay_ms,
            self.multiplier,
            self.max_retries,
        );
        if self.jitter {
            config
        } else {
            config.without_jitter()
        }
    }
}
