//! OpenAPI specification generation for the blueblue API.
//!
//! The document covers the JSON endpoints and the scan controls. The HTML pages and the
//! static file tree are left out.

use axum::Json;
use blueblue_core::{DeviceView, ScanState, ScanStatus};
use utoipa::OpenApi;

use super::devices::DeviceListResponse;
use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::scan::ScanControlResponse;

/// Serve the OpenAPI specification as JSON.
///
/// Available at `/api/openapi.json`.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a pretty-printed string.
/// Used by the gen-openapi binary.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for blueblue.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "blueblue API",
        version = "0.1.0",
        description = r"
# blueblue API

blueblue listens for Bluetooth Low Energy advertisements and shows which devices are nearby.

## Overview

1. **Scan control**: start and stop a background scan that runs in fixed-length windows
2. **Devices**: every device heard in the last 60 seconds, strongest signal first

Stopping is cooperative. The window in progress always finishes, so the state stays
`scanning` for up to one window after a stop request.
",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local blueblue server")
    ),
    tags(
        (
            name = "system",
            description = "Health checks"
        ),
        (
            name = "scan",
            description = "Start, stop and inspect the background scan"
        ),
        (
            name = "devices",
            description = "Nearby devices ranked by signal strength"
        )
    ),
    paths(
        super::health::health_check,
        super::scan::start_scan,
        super::scan::stop_scan,
        super::scan::scan_status,
        super::devices::list_devices,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            ScanControlResponse,
            ScanState,
            ScanStatus,
            DeviceView,
            DeviceListResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "blueblue API");
        assert!(spec.paths.paths.contains_key("/api/devices"));
        assert!(spec.paths.paths.contains_key("/stop"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"blueblue API\""));
        assert!(json.contains("scanresponse"));
    }
}
