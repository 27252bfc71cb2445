//! API error types and response handling.
//!
//! JSON endpoints answer errors with an [`ErrorResponse`] body. HTML pages that fail to
//! render answer with the error text as a plain-text body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use blueblue_core::{BlueblueError, ScanState};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::render::RenderError;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
#[derive(Debug)]
pub enum ApiError {
    /// An error from the scan pipeline; the status comes from
    /// [`BlueblueError::http_status_code`].
    Core(BlueblueError),

    /// 500 Internal Server Error - a page template could not be executed.
    Render {
        /// The render error text, returned verbatim in the body.
        message: String,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "already_scanning",
    "message": "A scan is already in progress",
    "details": {"state": "scanning"}
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "already_scanning").
    #[schema(example = "already_scanning")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "A scan is already in progress")]
    pub message: String,

    /// Optional additional details.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Core(err) => {
                let status = StatusCode::from_u16(err.http_status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let error_code = err.error_code().to_ascii_lowercase();

                if status.is_server_error() {
                    tracing::error!(error_code = %error_code, error = %err, "Request failed");
                } else {
                    tracing::debug!(error_code = %error_code, "Scan control conflict");
                }

                let details = err
                    .is_conflict()
                    .then(|| serde_json::json!({ "state": conflict_state(&err) }));
                let body = ErrorResponse {
                    error: error_code,
                    message: err.to_string(),
                    details,
                };
                (status, Json(body)).into_response()
            }

            Self::Render { message } => {
                tracing::error!(error = %message, "Error executing template");
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

/// The scan state a conflict reports: the state that blocked the transition.
const fn conflict_state(err: &BlueblueError) -> ScanState {
    match err {
        BlueblueError::NotScanning => ScanState::Idle,
        _ => ScanState::Scanning,
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core(err) => write!(f, "{err}"),
            Self::Render { message } => write!(f, "Render Error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        Self::Render {
            message: err.to_string(),
        }
    }
}

/// Convert from blueblue_core errors.
impl From<BlueblueError> for ApiError {
    fn from(err: BlueblueError) -> Self {
        Self::Core(err)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_conflicts_are_409_with_blocking_state() {
        let response = ApiError::from(BlueblueError::AlreadyScanning).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"], "already_scanning");
        assert_eq!(body["details"]["state"], "scanning");

        let response = ApiError::from(BlueblueError::NotScanning).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["message"], "No scan is in progress");
        assert_eq!(body["details"]["state"], "idle");
    }

    #[test]
    fn test_render_error_is_500() {
        let err = ApiError::from(RenderError::Unavailable {
            name: "devices.html",
            reason: "missing".into(),
        });
        assert!(err.to_string().contains("devices.html"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_bluetooth_errors_are_503_without_details() {
        let response = ApiError::from(BlueblueError::BluetoothAdapterNotFound).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"], "bluetooth_adapter_not_found");
        assert!(body["details"].is_null());
    }
}
