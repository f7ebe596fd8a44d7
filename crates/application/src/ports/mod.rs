//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod branch_directory;
mod draft_cache;
mod letter_repository;

#[cfg(test)]
pub use branch_directory::MockBranchDirectoryPort;
pub use branch_directory::BranchDirectoryPort;
#[cfg(test)]
pub use draft_cache::MockDraftCachePort;
pub use draft_cache::{DraftCachePort, InMemoryDraftCache, sort_oldest_first};
#[cfg(test)]
pub use letter_repository::MockLetterRepositoryPort;
pub use letter_repository::{InsertOutcome, LetterRepositoryPort, ReservationOutcome};
