//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and status endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        // Numbering scopes (v1)
        .route(
            "/v1/scopes/{branch_code}/{year}/max",
            get(handlers::scopes::query_max),
        )
        .route(
            "/v1/scopes/{branch_code}/{year}/letters",
            get(handlers::scopes::list_letters),
        )
        // Reservations (v1)
        .route("/v1/reservations", post(handlers::reservations::reserve))
        .route(
            "/v1/reservations/{key}",
            get(handlers::reservations::find_reservation),
        )
        // Letters (v1)
        .route("/v1/letters", post(handlers::letters::submit_letter))
        .route("/v1/letters/{key}", get(handlers::letters::find_letter))
        // Attach state
        .with_state(state)
}
