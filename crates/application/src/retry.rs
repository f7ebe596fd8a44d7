//! Retry logic with exponential backoff
//!
//! Submissions to the letter repository retry transient failures with
//! exponential backoff and jitter. Every attempt of a submission reuses the
//! same idempotency key, so repeating an attempt that actually reached the
//! repository is harmless.
//!
//! # Example
//!
//! ```rust,ignore
//! use application::retry::{RetryConfig, with_retry_until_cancelled};
//!
//! let config = RetryConfig::default();
//! let attempt = with_retry_until_cancelled(&config, &cancel, || async {
//!     repository.insert(&letter, key).await
//! }).await;
//! ```

use std::{future::Future, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ApplicationError;

/// Configuration for retry behavior with exponential backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Initial delay before first retry in milliseconds (default: 500ms)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds (default: 30s)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Maximum number of retries after the first attempt (default: 5)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Whether to add jitter so clients reconnecting together spread out
    #[serde(default = "default_true")]
    pub jitter_enabled: bool,

    /// Maximum jitter factor (0.0 to 1.0, default: 0.2)
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

const fn default_initial_delay() -> u64 {
    500
}

const fn default_max_delay() -> u64 {
    30_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_max_retries() -> u32 {
    5
}

const fn default_true() -> bool {
    true
}

const fn default_jitter_factor() -> f64 {
    0.2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            max_retries: default_max_retries(),
            jitter_enabled: default_true(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn new(
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
        max_retries: u32,
    ) -> Self {
        Self {
            initial_delay_ms,
            max_delay_ms,
            multiplier,
            max_retries,
            jitter_enabled: true,
            jitter_factor: 0.2,
        }
    }

    /// Fail on the first error
    #[must_use]
    pub const fn none() -> Self {
        Self {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 1.0,
            max_retries: 0,
            jitter_enabled: false,
            jitter_factor: 0.0,
        }
    }

    /// Disable jitter (deterministic delays)
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter_enabled = false;
        self
    }

    /// Delay before retry number `attempt` (0-indexed)
    ///
    /// `initial_delay * multiplier^attempt`, capped at `max_delay`, then
    /// jittered by up to `jitter_factor` in either direction.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let base_delay = (self.initial_delay_ms as f64) * self.multiplier.powi(exponent);
        let capped_delay = base_delay.min(self.max_delay_ms as f64);

        let final_delay = if self.jitter_enabled && capped_delay > 0.0 {
            let jitter_range = capped_delay * self.jitter_factor.clamp(0.0, 1.0);
            let jitter = rand::rng().random_range(-jitter_range..=jitter_range);
            (capped_delay + jitter).max(0.0)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Errors that can be checked for retryability
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ApplicationError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}

/// Final result of a retried operation plus attempt metadata
#[derive(Debug)]
pub struct RetryResult<T, E> {
    pub result: Result<T, E>,
    /// Number of attempts made (1 = no retries)
    pub attempts: u32,
}

/// Execute an async operation, retrying retryable errors until it
/// succeeds, fails permanently, runs out of retries or `cancel` fires
///
/// Cancellation interrupts both the backoff sleep and an attempt in flight.
/// Returns `None` when cancelled.
#[allow(clippy::cast_possible_truncation)]
pub async fn with_retry_until_cancelled<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Option<RetryResult<T, E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let result = tokio::select! {
            () = cancel.cancelled() => {
                debug!(attempts, "Retry loop cancelled during attempt");
                return None;
            }
            result = operation() => result,
        };

        let err = match result {
            Ok(value) => {
                if attempts > 1 {
                    debug!(
                        attempts,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Operation succeeded after retries"
                    );
                }
                return Some(RetryResult {
                    result: Ok(value),
                    attempts,
                });
            },
            Err(err) => err,
        };

        let retry_attempt = attempts - 1;
        if !err.is_retryable() {
            debug!(attempts, error = %err, "Operation failed with non-retryable error");
            return Some(RetryResult {
                result: Err(err),
                attempts,
            });
        }

        if retry_attempt >= config.max_retries {
            warn!(
                attempts,
                max_retries = config.max_retries,
                duration_ms = start.elapsed().as_millis() as u64,
                error = %err,
                "Operation failed after max retries"
            );
            return Some(RetryResult {
                result: Err(err),
                attempts,
            });
        }

        let delay = config.delay_for_attempt(retry_attempt);
        warn!(
            attempt = attempts,
            max_retries = config.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Operation failed, retrying"
        );

        tokio::select! {
            () = cancel.cancelled() => {
                debug!(attempts, "Retry loop cancelled during backoff");
                return None;
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    fn flaky(failures: u32) -> impl FnMut() -> std::future::Ready<Result<u32, ApplicationError>> {
        let calls = Arc::new(AtomicU32::new(0));
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n <= failures {
                Err(ApplicationError::Connectivity("connection refused".into()))
            } else {
                Ok(n)
            })
        }
    }

    #[test]
    fn config_default_values() {
        let config = RetryConfig::default();
        assert_eq!(config.initial_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 30_000);
        assert_eq!(config.max_retries, 5);
        assert!(config.jitter_enabled);
    }

    #[test]
    fn delay_doubles_without_jitter() {
        let config = RetryConfig::new(100, 10_000, 2.0, 5).without_jitter();
        let delays: Vec<_> = (0..4)
            .map(|a| config.delay_for_attempt(a).as_millis())
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800]);
    }

    #[test]
    fn delay_capped_at_max() {
        let config = RetryConfig::new(1000, 2000, 2.0, 5).without_jitter();
        assert_eq!(config.delay_for_attempt(1).as_millis(), 2000);
        assert_eq!(config.delay_for_attempt(60).as_millis(), 2000);
    }

    #[test]
    fn jittered_delay_stays_in_range() {
        let config = RetryConfig {
            initial_delay_ms: 1000,
            max_delay_ms: 1000,
            multiplier: 1.0,
            max_retries: 3,
            jitter_enabled: true,
            jitter_factor: 0.1,
        };
        for _ in 0..20 {
            let delay_ms = config.delay_for_attempt(0).as_millis();
            assert!((900..=1100).contains(&delay_ms), "delay_ms={delay_ms}");
        }
    }

    #[test]
    fn config_deserialization_fills_defaults() {
        let config: RetryConfig = serde_json::from_str(r#"{"max_retries":2}"#).unwrap();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.initial_delay_ms, 500);
    }

    async fn run(
        config: &RetryConfig,
        op: impl FnMut() -> std::future::Ready<Result<u32, ApplicationError>>,
    ) -> RetryResult<u32, ApplicationError> {
        with_retry_until_cancelled(config, &CancellationToken::new(), op)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let config = RetryConfig::new(1, 5, 2.0, 3).without_jitter();
        let result = run(&config, flaky(2)).await;
        assert_eq!(result.attempts, 3);
        assert_eq!(result.result.unwrap(), 3);
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = run(&RetryConfig::new(1, 5, 2.0, 3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err(ApplicationError::Validation("body".into())))
        })
        .await;
        assert!(matches!(result.result, Err(ApplicationError::Validation(_))));
        assert_eq!(result.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let config = RetryConfig::new(1, 5, 2.0, 2).without_jitter();
        let result = run(&config, flaky(u32::MAX)).await;
        assert_eq!(result.attempts, 3);
        assert!(matches!(result.result, Err(ApplicationError::Connectivity(_))));
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let result = run(&RetryConfig::none(), flaky(1)).await;
        assert_eq!(result.attempts, 1);
        assert!(result.result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let config = RetryConfig::new(60_000, 60_000, 1.0, 10).without_jitter();
        let cancel = CancellationToken::new();
        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                with_retry_until_cancelled(&config, &cancel, flaky(u32::MAX))
                    .await
                    .is_none()
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        assert!(task.await.unwrap());
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_attempt_completes() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = with_retry_until_cancelled(&RetryConfig::none(), &cancel, || {
            std::future::pending::<Result<(), ApplicationError>>()
        })
        .await;
        assert!(outcome.is_none());
    }
}
