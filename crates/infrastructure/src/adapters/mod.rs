//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod branch_directory;
mod http_letter_repository;
pub mod wire;

pub use branch_directory::ConfigBranchDirectory;
pub use http_letter_repository::{HttpLetterRepository, HttpLetterRepositoryConfig};
