//! # REST API for Inventory
//!
//! Unit counts, severity, dashboard statistics, alerts and the expiry sweep.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shared::BloodGroup;
use tracing::info;

use super::{error_response, query_params, session_from};
use crate::domain::inventory_service::level_of;
use crate::domain::LedgerError;
use crate::AppState;

const DEFAULT_ALERT_LIMIT: u32 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(get_inventory_summary))
        .route("/inventory/:group", get(get_inventory_level))
        .route("/statistics", get(get_statistics))
        .route("/alerts", get(list_alerts))
        .route("/expiry/sweep", post(sweep_expired))
}

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub limit: Option<u32>,
}

/// Count and severity for every group
pub async fn get_inventory_summary(State(state): State<AppState>) -> Response {
    info!("GET /api/inventory");

    match state.inventory_service.summary().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Count and severity for one group; the code may be URL-encoded (`A%2B`)
pub async fn get_inventory_level(State(state): State<AppState>, Path(group): Path<String>) -> Response {
    info!("GET /api/inventory/{}", group);

    let group = match group.parse::<BloodGroup>() {
        Ok(group) => group,
        Err(e) => return error_response(LedgerError::invalid(e.to_string())),
    };

    match state.inventory_service.get_counter(group).await {
        Ok(counter) => (StatusCode::OK, Json(level_of(counter))).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_statistics(State(state): State<AppState>) -> Response {
    info!("GET /api/statistics");

    match state.inventory_service.statistics().await {
        Ok(statistics) => (StatusCode::OK, Json(statistics)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn list_alerts(
    State(state): State<AppState>,
    query: Result<Query<AlertQuery>, QueryRejection>,
) -> Response {
    let query = match query_params(query) {
        Ok(query) => query,
        Err(response) => return response,
    };
    info!("GET /api/alerts - query: {:?}", query);

    match state
        .inventory_service
        .list_alerts(query.limit.unwrap_or(DEFAULT_ALERT_LIMIT))
        .await
    {
        Ok(alerts) => (StatusCode::OK, Json(alerts)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Run one expiry sweep
pub async fn sweep_expired(State(state): State<AppState>, headers: HeaderMap) -> Response {
    info!("POST /api/expiry/sweep");

    let session = session_from(&headers, &state);
    match state.ledger_service.sweep_expired(&session).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(e),
    }
}
