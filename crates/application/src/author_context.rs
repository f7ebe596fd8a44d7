//! Author context for draft creation
//!
//! Carries the author's branch and the numbering year explicitly, so no
//! service has to reach for ambient state (a current-branch global or the
//! wall clock) to decide where a letter will be numbered.
//!
//! # Examples
//!
//! ```
//! use application::AuthorContext;
//! use domain::BranchId;
//!
//! let ctx = AuthorContext::new(BranchId::new("riyadh").unwrap(), 2024);
//!
//! assert_eq!(ctx.branch_id().as_str(), "riyadh");
//! assert_eq!(ctx.year(), 2024);
//! assert!(!ctx.request_id().is_nil());
//! ```

use chrono::{Datelike, Utc};
use domain::BranchId;
use uuid::Uuid;

/// Branch and year an author is writing in, plus a correlation id
#[derive(Debug, Clone)]
pub struct AuthorContext {
    branch_id: BranchId,
    year: i32,
    request_id: Uuid,
}

impl AuthorContext {
    /// Create a context for an explicit branch and year
    #[must_use]
    pub fn new(branch_id: BranchId, year: i32) -> Self {
        Self {
            branch_id,
            year,
            request_id: Uuid::new_v4(),
        }
    }

    /// Create a context numbering in the current UTC year
    ///
    /// # Examples
    ///
    /// ```
    /// use application::AuthorContext;
    /// use chrono::{Datelike, Utc};
    /// use domain::BranchId;
    ///
    /// let ctx = AuthorContext::current_year(BranchId::new("hq").unwrap());
    /// assert_eq!(ctx.year(), Utc::now().year());
    /// ```
    #[must_use]
    pub fn current_year(branch_id: BranchId) -> Self {
        Self::new(branch_id, Utc::now().year())
    }

    /// Use a request id supplied by an upstream caller
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    pub const fn branch_id(&self) -> &BranchId {
        &self.branch_id
    }

    pub const fn year(&self) -> i32 {
        self.year
    }

    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_request_id_overrides_generated_id() {
        let id = Uuid::new_v4();
        let ctx = AuthorContext::new(BranchId::new("hq").unwrap(), 2025).with_request_id(id);
        assert_eq!(ctx.request_id(), id);
    }

    #[test]
    fn contexts_get_distinct_request_ids() {
        let branch = BranchId::new("hq").unwrap();
        let a = AuthorContext::new(branch.clone(), 2025);
        let b = AuthorContext::new(branch, 2025);
        assert_ne!(a.request_id(), b.request_id());
    }
}
