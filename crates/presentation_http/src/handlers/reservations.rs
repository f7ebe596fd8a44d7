//! Sequence number reservations

use application::{LetterRepositoryPort, ReservationOutcome};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use domain::Reservation;
use infrastructure::adapters::wire::ReserveRequest;
use tracing::{info, instrument};

use super::parse_key;
use crate::{error::ApiError, state::AppState};

/// Claim a number for an idempotency key
///
/// POST /v1/reservations
///
/// 201 when the number was claimed now, 200 when the key already holds a
/// number (returned in the body), 409 when another key owns it.
#[instrument(skip_all)]
pub async fn reserve(
    State(state): State<AppState>,
    payload: Result<Json<ReserveRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationOutcome>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let scope = request
        .scope()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = state
        .letters
        .reserve(&scope, request.sequence_number, request.idempotency_key)
        .await?;

    let status = match outcome {
        ReservationOutcome::Reserved => {
            info!(
                scope = %scope,
                number = %request.sequence_number,
                "Number reserved"
            );
            StatusCode::CREATED
        },
        ReservationOutcome::Taken => StatusCode::CONFLICT,
        ReservationOutcome::Held { .. } => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

/// Look up the reservation held by a key
///
/// GET /v1/reservations/{key}
#[instrument(skip(state))]
pub async fn find_reservation(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Reservation>, ApiError> {
    let key = parse_key(&key)?;
    state
        .letters
        .find_reservation(key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No reservation for {key}")))
}
