//! # REST API Interface Layer
//!
//! HTTP endpoints for the blood bank. Handlers translate JSON to service
//! calls and [`LedgerError`] to status codes; they hold no business rules.
//!
//! ## Error mapping
//!
//! - `InvalidArgument` → 400, or 404 when an ID was not found
//! - `InsufficientInventory` → 409
//! - `InvalidTransition` → 422
//! - `Storage` → 500
//!
//! Error bodies are `{ "error": kind, "message": text }`.

pub mod donation_apis;
pub mod donor_apis;
pub mod inventory_apis;
pub mod request_apis;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::domain::{LedgerError, SessionContext};
use crate::AppState;

/// Header naming the operator on whose behalf a mutation is made
pub const OPERATOR_HEADER: &str = "x-operator";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

pub fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidArgument(_) if err.is_not_found() => StatusCode::NOT_FOUND,
        LedgerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        LedgerError::InsufficientInventory { .. } => StatusCode::CONFLICT,
        LedgerError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a domain failure into its HTTP response
pub fn error_response(err: LedgerError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {:?}", err);
    } else {
        warn!("Request rejected: {}", err);
    }

    let body = ErrorBody {
        error: err.kind().to_string(),
        message: err.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Unwrap a JSON body, reporting malformed input as an argument error
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| error_response(LedgerError::invalid(rejection.body_text())))
}

/// Unwrap query parameters the same way as [`json_body`]
pub fn query_params<T>(query: Result<axum::extract::Query<T>, QueryRejection>) -> Result<T, Response> {
    query
        .map(|axum::extract::Query(value)| value)
        .map_err(|rejection| error_response(LedgerError::invalid(rejection.body_text())))
}

/// Session for one HTTP call: the `X-Operator` header or the configured default
pub fn session_from(headers: &HeaderMap, state: &AppState) -> SessionContext {
    let operator = headers
        .get(OPERATOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(state.default_operator.as_str());

    SessionContext::new(operator)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        Router,
    };
    use serde::de::DeserializeOwned;
    use serde_json::Value;
    use tower::util::ServiceExt; // for `oneshot`

    use crate::storage::DbConnection;
    use crate::{api_router, AppState};

    pub async fn setup_test_app() -> (Router, DbConnection) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let app = api_router(AppState::new(db.clone(), "test-admin"));
        (app, db)
    }

    /// Send one request and return the status with the parsed JSON body
    pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-operator", "nurse.test");
        let request = match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub fn parse<T: DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).unwrap()
    }
}
