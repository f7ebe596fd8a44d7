//! Numbering scope and sequence numbers
//!
//! Sequence numbers are unique per `(branch code, year)` pair. The scope is
//! always passed explicitly; nothing in the domain derives it from ambient
//! state such as the current clock.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::BranchCode;
use crate::errors::DomainError;

/// Positive per-scope sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SequenceNumber(u32);

impl SequenceNumber {
    /// The first number handed out in an empty scope
    pub const FIRST: Self = Self(1);

    /// Create a sequence number, rejecting zero
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::InvalidSequenceNumber(0));
        }
        Ok(Self(value))
    }

    /// Convert from a storage integer
    pub fn from_i64(value: i64) -> Result<Self, DomainError> {
        u32::try_from(value)
            .map_err(|_| DomainError::InvalidSequenceNumber(value))
            .and_then(Self::new)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// The number following this one
    pub fn next(self) -> Result<Self, DomainError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(DomainError::InvalidSequenceNumber(i64::from(self.0) + 1))
    }

    /// The first candidate after an optional scope maximum
    pub fn after(max: Option<Self>) -> Result<Self, DomainError> {
        max.map_or(Ok(Self::FIRST), Self::next)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for SequenceNumber {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SequenceNumber> for u32 {
    fn from(n: SequenceNumber) -> Self {
        n.0
    }
}

impl From<SequenceNumber> for i64 {
    fn from(n: SequenceNumber) -> Self {
        Self::from(n.0)
    }
}

/// The `(branch code, year)` pair within which sequence numbers are unique
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "ScopeParts")]
pub struct NumberingScope {
    branch_code: BranchCode,
    year: i32,
}

#[derive(Deserialize)]
struct ScopeParts {
    branch_code: BranchCode,
    year: i32,
}

impl TryFrom<ScopeParts> for NumberingScope {
    type Error = DomainError;

    fn try_from(parts: ScopeParts) -> Result<Self, Self::Error> {
        Self::new(parts.branch_code, parts.year)
    }
}

impl NumberingScope {
    pub const MIN_YEAR: i32 = 1000;
    pub const MAX_YEAR: i32 = 9999;

    /// Create a scope for a four-digit calendar year
    pub fn new(branch_code: BranchCode, year: i32) -> Result<Self, DomainError> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(DomainError::InvalidYear(year));
        }
        Ok(Self { branch_code, year })
    }

    pub const fn branch_code(&self) -> &BranchCode {
        &self.branch_code
    }

    pub const fn year(&self) -> i32 {
        self.year
    }
}

impl fmt::Display for NumberingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.branch_code, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ry() -> BranchCode {
        BranchCode::new("RY").unwrap()
    }

    #[test]
    fn zero_is_not_a_sequence_number() {
        assert!(SequenceNumber::new(0).is_err());
        assert_eq!(SequenceNumber::new(1).unwrap(), SequenceNumber::FIRST);
    }

    #[test]
    fn after_empty_scope_is_first() {
        assert_eq!(SequenceNumber::after(None).unwrap(), SequenceNumber::FIRST);
    }

    #[test]
    fn after_max_is_successor() {
        let max = SequenceNumber::new(41).unwrap();
        assert_eq!(SequenceNumber::after(Some(max)).unwrap().get(), 42);
    }

    #[test]
    fn next_overflow_is_an_error() {
        let max = SequenceNumber::new(u32::MAX).unwrap();
        assert!(max.next().is_err());
    }

    #[test]
    fn from_i64_rejects_out_of_range() {
        assert!(SequenceNumber::from_i64(-3).is_err());
        assert!(SequenceNumber::from_i64(i64::from(u32::MAX) + 1).is_err());
        assert_eq!(SequenceNumber::from_i64(7).unwrap().get(), 7);
    }

    #[test]
    fn scope_requires_four_digit_year() {
        assert!(NumberingScope::new(ry(), 24).is_err());
        assert!(NumberingScope::new(ry(), 10_000).is_err());
        assert_eq!(NumberingScope::new(ry(), 2024).unwrap().year(), 2024);
    }

    #[test]
    fn scope_display() {
        let scope = NumberingScope::new(ry(), 2024).unwrap();
        assert_eq!(scope.to_string(), "RY/2024");
    }

    #[test]
    fn scope_deserialization_validates_year() {
        let ok: NumberingScope =
            serde_json::from_str(r#"{"branch_code":"ry","year":2024}"#).unwrap();
        assert_eq!(ok.branch_code().as_str(), "RY");
        assert!(serde_json::from_str::<NumberingScope>(r#"{"branch_code":"RY","year":99}"#).is_err());
    }
}
