//! Application layer - Use cases and orchestration
//!
//! Defines the ports the letter desk needs from the outside world (draft
//! cache, letter repository, branch directory) and the services that
//! orchestrate drafting, numbering and synchronization on top of them.

pub mod author_context;
pub mod error;
pub mod ports;
pub mod retry;
pub mod services;

#[cfg(test)]
mod testing;

pub use author_context::AuthorContext;
pub use error::ApplicationError;
pub use ports::*;
pub use retry::{RetryConfig, RetryResult, Retryable};
pub use services::*;
