//! # REST API for Donor Management
//!
//! Endpoints for registering, retrieving, correcting and removing donors.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use shared::{RegisterDonorRequest, UpdateDonorRequest};
use tracing::info;

use super::{error_response, json_body, query_params, session_from};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/donors", get(list_donors).post(register_donor))
        .route("/donors/:id", get(get_donor).put(update_donor).delete(delete_donor))
        .route("/donors/:id/donations", get(list_donation_events))
        .route("/history/donations", get(donation_history))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub from: String,
    pub to: String,
}

/// Register a donor and schedule their first donation
pub async fn register_donor(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RegisterDonorRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!("POST /api/donors - request: {:?}", request);

    let session = session_from(&headers, &state);
    match state.donor_service.register_donor(&session, request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn list_donors(State(state): State<AppState>) -> Response {
    info!("GET /api/donors");

    match state.donor_service.list_donors().await {
        Ok(donors) => (StatusCode::OK, Json(donors)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_donor(State(state): State<AppState>, Path(donor_id): Path<i64>) -> Response {
    info!("GET /api/donors/{}", donor_id);

    match state.donor_service.get_donor(donor_id).await {
        Ok(donor) => (StatusCode::OK, Json(donor)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn update_donor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(donor_id): Path<i64>,
    payload: Result<Json<UpdateDonorRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!("PUT /api/donors/{} - request: {:?}", donor_id, request);

    let session = session_from(&headers, &state);
    match state.donor_service.update_donor(&session, donor_id, request).await {
        Ok(donor) => (StatusCode::OK, Json(donor)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Remove a donor and their donation events; inventory is untouched
pub async fn delete_donor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(donor_id): Path<i64>,
) -> Response {
    info!("DELETE /api/donors/{}", donor_id);

    let session = session_from(&headers, &state);
    match state.ledger_service.delete_donor(&session, donor_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn list_donation_events(State(state): State<AppState>, Path(donor_id): Path<i64>) -> Response {
    info!("GET /api/donors/{}/donations", donor_id);

    match state.donor_service.list_donation_events(donor_id).await {
        Ok(events) => (StatusCode::OK, Json(events)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Donors who last donated within an inclusive date range
pub async fn donation_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Response {
    let query = match query_params(query) {
        Ok(query) => query,
        Err(response) => return response,
    };
    info!("GET /api/history/donations - query: {:?}", query);

    match state.donor_service.donation_history(&query.from, &query.to).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(e) => error_response(e),
    }
}
