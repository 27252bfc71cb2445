//! Scan control endpoints.
//!
//! `/start` and `/stop` accept both GET and POST so the control page can use plain links.
//! Each answers 200 when the transition happens and 409 when the controller is already in
//! the requested state.

use axum::extract::State;
use axum::Json;
use blueblue_core::{ScanState, ScanStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::state::SharedState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Result of a start or stop request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "state": "scanning",
    "session_id": "7f0c2a8e-3d2b-4f7a-9c41-0a5e6b1d2c3f",
    "message": "Scanning started"
}))]
pub struct ScanControlResponse {
    /// Controller state right after the request.
    pub state: ScanState,

    /// Session the request applied to.
    pub session_id: Option<Uuid>,

    /// Human-readable outcome.
    #[schema(example = "Scanning started")]
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Start scanning.
#[utoipa::path(
    post,
    path = "/start",
    tag = "scan",
    operation_id = "startScan",
    summary = "Start scanning",
    description = "Launches the background scan loop. Scanning runs in back-to-back windows \
        until stopped. Also accepts GET.",
    responses(
        (status = 200, description = "Scanning started", body = ScanControlResponse),
        (status = 409, description = "Already scanning", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn start_scan(State(state): State<SharedState>) -> ApiResult<Json<ScanControlResponse>> {
    let session_id = state.scanner().start()?;

    Ok(Json(ScanControlResponse {
        state: ScanState::Scanning,
        session_id: Some(session_id),
        message: "Scanning started".to_string(),
    }))
}

/// Stop scanning.
#[utoipa::path(
    post,
    path = "/stop",
    tag = "scan",
    operation_id = "stopScan",
    summary = "Stop scanning",
    description = "Asks the scan loop to stop. The window in progress is allowed to finish, \
        so the state reads `scanning` until it does. Also accepts GET.",
    responses(
        (status = 200, description = "Stop requested", body = ScanControlResponse),
        (status = 409, description = "Not scanning, or stop already requested", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn stop_scan(State(state): State<SharedState>) -> ApiResult<Json<ScanControlResponse>> {
    state.scanner().stop()?;
    let status = state.scanner().status();

    Ok(Json(ScanControlResponse {
        state: status.state,
        session_id: status.session_id,
        message: "Stop requested; scanning ends after the current window".to_string(),
    }))
}

/// Get the scan controller status.
#[utoipa::path(
    get,
    path = "/api/scan",
    tag = "scan",
    operation_id = "getScanStatus",
    summary = "Get scan status",
    description = "Returns whether a scan is running, the window length and progress of the \
        current or most recent session.",
    responses(
        (status = 200, description = "Scan status", body = ScanStatus)
    )
)]
pub async fn scan_status(State(state): State<SharedState>) -> Json<ScanStatus> {
    Json(state.scanner().status())
}
