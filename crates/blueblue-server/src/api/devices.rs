//! Device list as JSON.

use axum::extract::State;
use axum::Json;
use blueblue_core::{DeviceView, FRESHNESS_WINDOW_SECS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Fresh devices ranked by signal strength.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "devices": [
        {
            "address": "AA:BB:CC:DD:EE:FF",
            "detected": "2025-01-15T03:30:00Z",
            "since": "4",
            "name": "Pixel 8",
            "rssi": -48,
            "advertisement": "02 01 06 ",
            "scanresponse": ""
        }
    ],
    "count": 1,
    "freshness_window_secs": 60,
    "generated_at_utc": "2025-01-15T03:30:04Z"
}))]
pub struct DeviceListResponse {
    /// Devices seen within the freshness window, strongest signal first.
    pub devices: Vec<DeviceView>,

    /// Number of devices listed.
    #[schema(example = 1)]
    pub count: usize,

    /// Devices older than this are left out.
    #[schema(example = 60)]
    pub freshness_window_secs: i64,

    /// Query time the ages were computed against.
    pub generated_at_utc: DateTime<Utc>,
}

/// List fresh devices.
#[utoipa::path(
    get,
    path = "/api/devices",
    tag = "devices",
    operation_id = "listDevices",
    summary = "List nearby devices",
    description = "Returns every device heard within the last 60 seconds, sorted by RSSI \
        descending. Devices with equal RSSI keep a stable order.",
    responses(
        (status = 200, description = "Device list", body = DeviceListResponse)
    )
)]
pub async fn list_devices(State(state): State<SharedState>) -> Json<DeviceListResponse> {
    let now = Utc::now();
    let devices = state.query().devices_at(now);

    Json(DeviceListResponse {
        count: devices.len(),
        devices,
        freshness_window_secs: FRESHNESS_WINDOW_SECS,
        generated_at_utc: now,
    })
}
