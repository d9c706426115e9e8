//! # Blood Bank Backend
//!
//! Inventory ledger for a blood bank: donors, donations, hospital requests
//! and per-group unit counts, served over a JSON REST API.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST handlers)
//!     ↓
//! Domain Layer (ledger, registries, inventory queries)
//!     ↓
//! Storage Layer (SQLite via sqlx)
//! ```
//!
//! The ledger is the only component that changes unit counts. Every change it
//! makes is one database transaction, serialized per blood group.

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::BackendConfig;
use crate::domain::{DonorService, InventoryService, LedgerService, RequestService};
use crate::storage::DbConnection;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub ledger_service: LedgerService,
    pub donor_service: DonorService,
    pub request_service: RequestService,
    pub inventory_service: InventoryService,
    /// Operator recorded when a request carries no `X-Operator` header
    pub default_operator: String,
}

impl AppState {
    pub fn new(db: DbConnection, default_operator: impl Into<String>) -> Self {
        Self {
            ledger_service: LedgerService::new(db.clone()),
            donor_service: DonorService::new(db.clone()),
            request_service: RequestService::new(db.clone()),
            inventory_service: InventoryService::new(db),
            default_operator: default_operator.into(),
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &BackendConfig) -> Result<AppState> {
    info!("Setting up database");
    let db = DbConnection::new(&config.database_url).await?;

    info!("Setting up application state");
    Ok(AppState::new(db, config.default_operator.clone()))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: '{}'", cors_origin))?;

    // CORS setup to allow the frontend to make requests
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(io::rest::OPERATOR_HEADER)]);

    Ok(api_router(app_state).layer(cors).layer(TraceLayer::new_for_http()))
}

/// The `/api` routes without middleware
pub fn api_router(app_state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(io::rest::inventory_apis::router())
        .merge(io::rest::donor_apis::router())
        .merge(io::rest::donation_apis::router())
        .merge(io::rest::request_apis::router());

    Router::new().nest("/api", api_routes).with_state(app_state)
}
