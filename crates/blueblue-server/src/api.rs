//! HTTP routes and handlers.
//!
//! Endpoints are organized by domain:
//! - `pages` - HTML control page and device list
//! - `scan` - start, stop and status of the scan loop
//! - `devices` - device list as JSON
//! - `health` - service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod devices;
pub mod error;
pub mod health;
pub mod openapi;
pub mod pages;
pub mod scan;

pub use error::{ApiError, ApiResult, ErrorResponse};

// Re-export OpenAPI utilities for the gen-openapi binary
pub use openapi::get_openapi_json;

/// Creates the combined router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /                      - Control page (HTML)
/// /devices               - Device list (HTML)
/// /start                 - Start scanning (GET or POST)
/// /stop                  - Stop scanning (GET or POST)
/// /public/*              - Static files from the public directory
/// /health                - Health check
/// /api
/// ├── /devices           - Device list (JSON)
/// ├── /scan              - Scan status
/// └── /openapi.json      - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    let public = ServeDir::new(state.public_dir());

    Router::new()
        .route("/", get(pages::index))
        .route("/devices", get(pages::devices))
        .route("/start", get(scan::start_scan).post(scan::start_scan))
        .route("/stop", get(scan::stop_scan).post(scan::stop_scan))
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/devices", get(devices::list_devices))
                .route("/scan", get(scan::scan_status))
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .nest_service("/public", public)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
