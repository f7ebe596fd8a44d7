//! Numbering scope queries

use application::LetterRepositoryPort;
use axum::{
    Json,
    extract::{Path, State},
};
use domain::FinalizedLetter;
use infrastructure::adapters::wire::MaxResponse;
use tracing::{debug, instrument};

use super::scope_from_path;
use crate::{error::ApiError, state::AppState};

/// Highest reserved number in a scope
///
/// GET /v1/scopes/{branch_code}/{year}/max
#[instrument(skip(state))]
pub async fn query_max(
    State(state): State<AppState>,
    Path((branch_code, year)): Path<(String, i32)>,
) -> Result<Json<MaxResponse>, ApiError> {
    let scope = scope_from_path(&branch_code, year)?;
    let max = state.letters.query_max(&scope).await?;
    debug!(?max, "Scope max queried");
    Ok(Json(MaxResponse { max }))
}

/// Every stored letter in a scope, by number
///
/// GET /v1/scopes/{branch_code}/{year}/letters
#[instrument(skip(state))]
pub async fn list_letters(
    State(state): State<AppState>,
    Path((branch_code, year)): Path<(String, i32)>,
) -> Result<Json<Vec<FinalizedLetter>>, ApiError> {
    let scope = scope_from_path(&branch_code, year)?;
    let letters = state.letters.letters_in(&scope).await?;
    debug!(count = letters.len(), "Listed letters");
    Ok(Json(letters))
}
