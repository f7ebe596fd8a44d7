//! Domain layer for Letterdesk
//!
//! Contains the numbering and draft model: branch scopes, sequence numbers,
//! reference strings, drafts and the per-draft sync state machine.
//! This layer performs no I/O and defines the ubiquitous language.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
