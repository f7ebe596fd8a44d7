//! Column encodings shared by the SQLite stores
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with microsecond
//! precision and a `Z` suffix, so text order is chronological order.

use application::error::ApplicationError;
use chrono::{DateTime, SecondsFormat, Utc};
use domain::{BranchCode, LetterContent, LocalId, NumberingScope, RemoteId, SequenceNumber};

use super::error::corrupt_row;

pub fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, ApplicationError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| corrupt_row("timestamp", e))
}

pub fn decode_scope(branch_code: &str, year: i64) -> Result<NumberingScope, ApplicationError> {
    let code = BranchCode::new(branch_code).map_err(|e| corrupt_row("scope", e))?;
    let year = i32::try_from(year).map_err(|e| corrupt_row("scope", e))?;
    NumberingScope::new(code, year).map_err(|e| corrupt_row("scope", e))
}

pub fn decode_sequence(raw: i64) -> Result<SequenceNumber, ApplicationError> {
    SequenceNumber::from_i64(raw).map_err(|e| corrupt_row("sequence number", e))
}

pub fn decode_local_id(raw: &str) -> Result<LocalId, ApplicationError> {
    LocalId::parse(raw).map_err(|e| corrupt_row("local id", e))
}

pub fn decode_remote_id(raw: &str) -> Result<RemoteId, ApplicationError> {
    RemoteId::parse(raw).map_err(|e| corrupt_row("remote id", e))
}

pub fn encode_content(content: &LetterContent) -> Result<String, ApplicationError> {
    serde_json::to_string(content)
        .map_err(|e| ApplicationError::Internal(format!("Failed to encode letter content: {e}")))
}

pub fn decode_content(raw: &str) -> Result<LetterContent, ApplicationError> {
    serde_json::from_str(raw).map_err(|e| corrupt_row("content", e))
}
