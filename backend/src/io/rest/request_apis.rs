//! # REST API for Hospital Requests
//!
//! Submitting, reviewing, editing and removing blood requests. Approval and
//! edits go through the ledger so inventory stays consistent.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shared::{EditBloodRequest, RequestStatus, SetRequestStatusRequest, SubmitBloodRequest};
use tracing::info;

use super::{error_response, json_body, query_params, session_from};
use crate::domain::LedgerError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests", get(list_requests).post(submit_request))
        .route("/requests/:id", get(get_request).put(edit_request).delete(delete_request))
        .route("/requests/:id/status", post(set_request_status))
}

#[derive(Debug, Deserialize)]
pub struct RequestListQuery {
    /// Pending, Approved, Rejected or All
    pub status: Option<String>,
}

impl RequestListQuery {
    fn status_filter(&self) -> Result<Option<RequestStatus>, LedgerError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
            Some(value) => value
                .parse::<RequestStatus>()
                .map(Some)
                .map_err(|e| LedgerError::invalid(e.to_string())),
        }
    }
}

pub async fn list_requests(
    State(state): State<AppState>,
    query: Result<Query<RequestListQuery>, QueryRejection>,
) -> Response {
    let query = match query_params(query) {
        Ok(query) => query,
        Err(response) => return response,
    };
    info!("GET /api/requests - query: {:?}", query);

    let status = match query.status_filter() {
        Ok(status) => status,
        Err(e) => return error_response(e),
    };

    match state.request_service.list_requests(status).await {
        Ok(requests) => (StatusCode::OK, Json(requests)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Submit a new Pending request; nothing is reserved until approval
pub async fn submit_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SubmitBloodRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!("POST /api/requests - request: {:?}", request);

    let session = session_from(&headers, &state);
    match state.ledger_service.submit_request(&session, request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_request(State(state): State<AppState>, Path(request_id): Path<i64>) -> Response {
    info!("GET /api/requests/{}", request_id);

    match state.request_service.get_request(request_id).await {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn edit_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(request_id): Path<i64>,
    payload: Result<Json<EditBloodRequest>, JsonRejection>,
) -> Response {
    let edit = match json_body(payload) {
        Ok(edit) => edit,
        Err(response) => return response,
    };
    info!("PUT /api/requests/{} - request: {:?}", request_id, edit);

    let session = session_from(&headers, &state);
    match state.ledger_service.edit_request(&session, request_id, edit).await {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(request_id): Path<i64>,
) -> Response {
    info!("DELETE /api/requests/{}", request_id);

    let session = session_from(&headers, &state);
    match state.ledger_service.delete_request(&session, request_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Approve or reject a Pending request
pub async fn set_request_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(request_id): Path<i64>,
    payload: Result<Json<SetRequestStatusRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!("POST /api/requests/{}/status - status: {}", request_id, request.status);

    let session = session_from(&headers, &state);
    match state
        .ledger_service
        .set_request_status(&session, request_id, request.status)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}
