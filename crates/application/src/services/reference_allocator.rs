//! Reference allocator
//!
//! Hands out per-scope sequence numbers. Uniqueness comes from the
//! repository's constraint on `(branch, year, number)`: the allocator reads
//! the current maximum, tries to reserve the successor and, if someone else
//! got there first, re-reads and tries again. Reading the maximum alone
//! never decides anything.
//!
//! Allocation is idempotent per key: a key that already holds a
//! reservation gets the same number back, which is what makes
//! crash-and-retry safe.

use std::{sync::Arc, time::Duration};

use domain::{LocalId, NumberingScope, SequenceNumber};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::ApplicationError,
    ports::{LetterRepositoryPort, ReservationOutcome},
};

/// Allocator tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Reservation attempts before giving up with a conflict
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base pause between attempts after losing a race, in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

const fn default_max_attempts() -> u32 {
    10
}

const fn default_backoff_ms() -> u64 {
    25
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl AllocatorConfig {
    /// Pause after losing `attempt` races: linear growth plus jitter
    fn backoff(&self, attempt: u32) -> Duration {
        if self.backoff_ms == 0 {
            return Duration::ZERO;
        }
        let jitter = rand::rng().random_range(0..=self.backoff_ms);
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)) + jitter)
    }
}

/// Allocates unique sequence numbers within a numbering scope
pub struct ReferenceAllocator {
    repository: Arc<dyn LetterRepositoryPort>,
    config: AllocatorConfig,
}

impl std::fmt::Debug for ReferenceAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceAllocator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReferenceAllocator {
    pub fn new(repository: Arc<dyn LetterRepositoryPort>, config: AllocatorConfig) -> Self {
        Self { repository, config }
    }

    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Allocate a number in `scope` for `key`
    ///
    /// # Errors
    ///
    /// - [`ApplicationError::Connectivity`] if the repository is unreachable;
    ///   no number is ever made up locally
    /// - [`ApplicationError::AllocationConflict`] if every attempt lost a race
    /// - [`ApplicationError::InvalidOperation`] if `key` already holds a
    ///   number in a different scope
    #[instrument(skip(self), fields(scope = %scope, key = %key))]
    pub async fn allocate(
        &self,
        scope: &NumberingScope,
        key: LocalId,
    ) -> Result<SequenceNumber, ApplicationError> {
        if let Some(existing) = self.repository.find_reservation(key).await? {
            if &existing.scope != scope {
                return Err(ApplicationError::InvalidOperation(format!(
                    "key {key} already holds {} in another scope",
                    existing.reference()
                )));
            }
            debug!(number = %existing.sequence_number, "Reusing existing reservation");
            return Ok(existing.sequence_number);
        }

        let max_attempts = self.config.max_attempts.max(1);
        let mut candidate = SequenceNumber::after(self.repository.query_max(scope).await?)?;

        for attempt in 1..=max_attempts {
            match self.repository.reserve(scope, candidate, key).await? {
                ReservationOutcome::Reserved => {
                    info!(number = %candidate, attempt, "Reserved sequence number");
                    return Ok(candidate);
                },
                ReservationOutcome::Held { sequence_number } => {
                    debug!(number = %sequence_number, "Key already held a reservation");
                    return Ok(sequence_number);
                },
                ReservationOutcome::Taken => {
                    debug!(number = %candidate, attempt, "Candidate taken, re-reading maximum");
                    if attempt == max_attempts {
                        break;
                    }
                    tokio::time::sleep(self.config.backoff(attempt)).await;
                    let fresh = SequenceNumber::after(self.repository.query_max(scope).await?)?;
                    candidate = fresh.max(candidate.next()?);
                },
            }
        }

        warn!(attempts = max_attempts, "Allocation attempts exhausted");
        Err(ApplicationError::AllocationConflict {
            scope: scope.clone(),
            attempts: max_attempts,
        })
    }
}
