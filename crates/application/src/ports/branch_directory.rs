//! Branch directory port
//!
//! Resolves the author's branch to the short code used in references.

use async_trait::async_trait;
use domain::{BranchCode, BranchId};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BranchDirectoryPort: Send + Sync {
    /// Look up the code for a branch
    ///
    /// Returns [`ApplicationError::NotFound`] for unknown branches.
    async fn lookup(&self, branch_id: &BranchId) -> Result<BranchCode, ApplicationError>;
}
