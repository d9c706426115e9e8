//! # REST API for Donations
//!
//! Walk-in donations plus completion and cancellation of scheduled ones.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use shared::{CompleteDonationRequest, RecordDonationRequest};
use tracing::info;

use super::{error_response, json_body, session_from};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/donations", post(record_donation))
        .route("/donations/:id/complete", post(complete_donation))
        .route("/donations/:id/cancel", post(cancel_donation))
}

/// Record units received from a donor right now
pub async fn record_donation(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RecordDonationRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!("POST /api/donations - request: {:?}", request);

    let session = session_from(&headers, &state);
    match state.ledger_service.record_donation(&session, request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn complete_donation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<i64>,
    payload: Result<Json<CompleteDonationRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!("POST /api/donations/{}/complete - units: {}", event_id, request.units);

    let session = session_from(&headers, &state);
    match state
        .ledger_service
        .complete_scheduled_donation(&session, event_id, request.units)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn cancel_donation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<i64>,
) -> Response {
    info!("POST /api/donations/{}/cancel", event_id);

    let session = session_from(&headers, &state);
    match state.donor_service.cancel_scheduled_donation(&session, event_id).await {
        Ok(event) => (StatusCode::OK, Json(event)).into_response(),
        Err(e) => error_response(e),
    }
}
