//! Per-draft submission state machine
//!
//! ```text
//! LocalOnly ──> Allocating ──> Submitting ──> Synced
//!     ^             │               │
//!     │             v               v
//!     └─────────  Failed  <─────────┘
//!
//! any non-terminal state ──> Abandoned
//! ```
//!
//! Allocating and Submitting may also fall back to LocalOnly when the
//! connection drops and the submission is queued.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Only in the local cache
    #[default]
    LocalOnly,
    /// Waiting for a sequence number
    Allocating,
    /// Number held, repository insert in flight
    Submitting,
    /// Confirmed by the repository
    Synced,
    /// Retries exhausted; can be retried
    Failed,
    /// Discarded by the author
    Abandoned,
}

impl SyncState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Synced | Self::Abandoned)
    }

    /// Whether a submission is currently in flight
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Allocating | Self::Submitting)
    }

    pub const fn can_transition_to(self, next: Self) -> bool {
        use SyncState::{Abandoned, Allocating, Failed, LocalOnly, Submitting, Synced};
        match (self, next) {
            (Synced | Abandoned, _) => false,
            (_, Abandoned)
            | (LocalOnly | Failed, Allocating)
            | (Allocating, Submitting)
            | (Submitting, Synced)
            | (Allocating | Submitting | Failed, LocalOnly)
            | (Allocating | Submitting, Failed) => true,
            _ => false,
        }
    }

    /// Move to `next`, rejecting transitions the machine does not allow
    pub fn transition(self, next: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalOnly => "local_only",
            Self::Allocating => "allocating",
            Self::Submitting => "submitting",
            Self::Synced => "synced",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::SyncState::*;
    use super::*;

    const ALL: [SyncState; 6] = [LocalOnly, Allocating, Submitting, Synced, Failed, Abandoned];

    #[test]
    fn happy_path_is_allowed() {
        let state = LocalOnly
            .transition(Allocating)
            .and_then(|s| s.transition(Submitting))
            .and_then(|s| s.transition(Synced))
            .unwrap();
        assert_eq!(state, Synced);
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for next in ALL {
            assert!(!Synced.can_transition_to(next));
            assert!(!Abandoned.can_transition_to(next));
        }
    }

    #[test]
    fn abandon_from_any_non_terminal_state() {
        for state in [LocalOnly, Allocating, Submitting, Failed] {
            assert!(state.can_transition_to(Abandoned), "{state}");
        }
    }

    #[test]
    fn failure_only_from_io_states() {
        assert!(Allocating.can_transition_to(Failed));
        assert!(Submitting.can_transition_to(Failed));
        assert!(!LocalOnly.can_transition_to(Failed));
    }

    #[test]
    fn failed_can_retry() {
        assert!(Failed.can_transition_to(Allocating));
    }

    #[test]
    fn cannot_skip_allocation() {
        assert!(!LocalOnly.can_transition_to(Submitting));
        assert!(!LocalOnly.can_transition_to(Synced));
        assert!(!Allocating.can_transition_to(Synced));
    }

    #[test]
    fn invalid_transition_error() {
        let err = Synced.transition(Allocating).unwrap_err();
        assert_eq!(err.to_string(), "Invalid sync transition: synced -> allocating");
    }
}
