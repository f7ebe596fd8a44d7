//! Persistence module
//!
//! SQLite storage via sqlx: the client-local draft cache and the
//! authoritative letter repository.

pub mod async_connection;
mod columns;
pub mod draft_cache;
pub mod error;
pub mod letter_repository;

pub use async_connection::{AsyncDatabase, AsyncDatabaseConfig, AsyncDatabaseError};
pub use draft_cache::SqliteDraftCache;
pub use letter_repository::SqliteLetterRepository;
