//! Finalized letters

use application::{InsertOutcome, LetterRepositoryPort};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use domain::{FinalizedLetter, LetterContent, NewLetter, NumberingScope, SequenceNumber};
use infrastructure::adapters::wire::{IDEMPOTENCY_KEY_HEADER, InsertResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use validator::Validate;

use super::parse_key;
use crate::{error::ApiError, middleware::ValidatedJson, state::AppState};

/// Body of `POST /v1/letters`
///
/// Same shape as the client's [`NewLetter`]; content must be complete.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitLetterRequest {
    pub scope: NumberingScope,
    pub sequence_number: SequenceNumber,
    #[validate(nested)]
    pub content: LetterContent,
}

impl From<SubmitLetterRequest> for NewLetter {
    fn from(request: SubmitLetterRequest) -> Self {
        Self {
            scope: request.scope,
            sequence_number: request.sequence_number,
            content: request.content,
        }
    }
}

/// Store a letter under the number its idempotency key reserved
///
/// POST /v1/letters
///
/// 201 on first insert, 409 with `code: "already_applied"` when the key was
/// already used, 422 when the key holds no matching reservation.
#[instrument(skip_all)]
pub async fn submit_letter(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<SubmitLetterRequest>,
) -> Result<(StatusCode, Json<InsertResponse>), ApiError> {
    let raw_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {IDEMPOTENCY_KEY_HEADER} header")))?
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("Malformed {IDEMPOTENCY_KEY_HEADER} header")))?;
    let key = parse_key(raw_key)?;

    let letter = NewLetter::from(request);
    match state.letters.insert(&letter, key).await? {
        InsertOutcome::Created(remote_id) => {
            info!(reference = %letter.reference(), %remote_id, "Letter stored");
            Ok((StatusCode::CREATED, Json(InsertResponse::created(remote_id))))
        },
        InsertOutcome::AlreadyApplied(remote_id) => Ok((
            StatusCode::CONFLICT,
            Json(InsertResponse::already_applied(remote_id)),
        )),
    }
}

/// Look up the letter stored for a key
///
/// GET /v1/letters/{key}
#[instrument(skip(state))]
pub async fn find_letter(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<FinalizedLetter>, ApiError> {
    let key = parse_key(&key)?;
    state
        .letters
        .find_letter(key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No letter for {key}")))
}
