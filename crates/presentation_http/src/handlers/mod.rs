//! HTTP request handlers

pub mod health;
pub mod letters;
pub mod reservations;
pub mod scopes;

use domain::{BranchCode, LocalId, NumberingScope};

use crate::error::ApiError;

/// Build a scope from `/{branch_code}/{year}` path segments
pub(crate) fn scope_from_path(branch_code: &str, year: i32) -> Result<NumberingScope, ApiError> {
    let code = BranchCode::new(branch_code).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    NumberingScope::new(code, year).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub(crate) fn parse_key(raw: &str) -> Result<LocalId, ApiError> {
    LocalId::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}
