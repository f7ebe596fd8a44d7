//! Branch identity and short codes
//!
//! A branch is known to the organization directory by an opaque
//! [`BranchId`]. Its [`BranchCode`] is the short prefix printed on every
//! reference string, e.g. `RY` in `RY-42/2024`.
//!
//! # Examples
//!
//! ```
//! use domain::BranchCode;
//!
//! let code = BranchCode::new(" ry ").unwrap();
//! assert_eq!(code.as_str(), "RY");
//!
//! // Separators used by reference strings are rejected
//! assert!(BranchCode::new("R-Y").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Opaque branch identifier from the organization directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchId(String);

impl BranchId {
    /// Create a branch ID, rejecting blank values
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let value = id.into().trim().to_string();
        if value.is_empty() {
            return Err(DomainError::InvalidBranchId(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BranchId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchId> for String {
    fn from(id: BranchId) -> Self {
        id.0
    }
}

/// Short upper-case branch code used as the reference prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchCode(String);

impl BranchCode {
    /// Maximum number of characters in a branch code
    pub const MAX_LEN: usize = 8;

    /// Create a branch code, normalizing to upper case
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidBranchCode`] unless the trimmed value
    /// is 1 to 8 ASCII alphanumerics.
    pub fn new(code: impl Into<String>) -> Result<Self, DomainError> {
        let value = code.into().trim().to_ascii_uppercase();
        let well_formed = !value.is_empty()
            && value.len() <= Self::MAX_LEN
            && value.chars().all(|c| c.is_ascii_alphanumeric());
        if !well_formed {
            return Err(DomainError::InvalidBranchCode(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BranchCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for BranchCode {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchCode> for String {
    fn from(code: BranchCode) -> Self {
        code.0
    }
}
