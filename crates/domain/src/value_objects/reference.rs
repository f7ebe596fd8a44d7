//! Human-readable letter references
//!
//! A reference is derived from a letter's scope and sequence number and is
//! never stored on its own.
//!
//! # Examples
//!
//! ```
//! use domain::ReferenceString;
//!
//! let reference: ReferenceString = "RY-42/2024".parse().unwrap();
//! assert_eq!(reference.sequence_number().get(), 42);
//! assert_eq!(reference.to_string(), "RY-42/2024");
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{BranchCode, NumberingScope, SequenceNumber};
use crate::errors::DomainError;

/// `{branch_code}-{sequence_number}/{year}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceString {
    scope: NumberingScope,
    sequence_number: SequenceNumber,
}

impl ReferenceString {
    pub const fn new(scope: NumberingScope, sequence_number: SequenceNumber) -> Self {
        Self {
            scope,
            sequence_number,
        }
    }

    pub const fn scope(&self) -> &NumberingScope {
        &self.scope
    }

    pub const fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    /// Parse a reference such as `RY-42/2024`
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidReference(s.to_string());
        let (head, year) = s.trim().rsplit_once('/').ok_or_else(invalid)?;
        let (code, seq) = head.split_once('-').ok_or_else(invalid)?;

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let seq: u32 = seq.parse().map_err(|_| invalid())?;

        let scope = NumberingScope::new(BranchCode::new(code)?, year)?;
        Ok(Self::new(scope, SequenceNumber::new(seq)?))
    }
}

impl fmt::Display for ReferenceString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}/{}",
            self.scope.branch_code(),
            self.sequence_number,
            self.scope.year()
        )
    }
}

impl FromStr for ReferenceString {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReferenceString {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReferenceString> for String {
    fn from(reference: ReferenceString) -> Self {
        reference.to_string()
    }
}
