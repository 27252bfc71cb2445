//! Shared types and OpenAPI schemas.
//!
//! [`DeviceRecord`] is what the registry stores; [`DeviceView`] is what leaves the
//! process (HTML and JSON). Scan controller state is described by [`ScanState`] and
//! [`ScanStatus`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The most recent observation of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device address, the registry key.
    pub address: String,

    /// When the latest advertisement was received.
    pub last_seen: DateTime<Utc>,

    /// Display name with non-graphic characters trimmed.
    pub name: String,

    /// Signal strength of the latest advertisement, in dBm.
    pub rssi: i16,

    /// Advertising payload as byte-grouped hex.
    pub advertisement: String,

    /// Scan response payload as byte-grouped hex.
    pub scan_response: String,
}

/// A device as presented to clients, with its age at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "address": "AA:BB:CC:DD:EE:FF",
    "detected": "2025-01-15T03:30:00Z",
    "since": "4",
    "name": "Pixel 8",
    "rssi": -48,
    "advertisement": "02 01 06 ",
    "scanresponse": ""
}))]
pub struct DeviceView {
    /// Device address.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub address: String,

    /// When the device was last detected (UTC).
    pub detected: DateTime<Utc>,

    /// Whole seconds since detection.
    #[schema(example = "4")]
    pub since: String,

    /// Sanitized device name (may be empty).
    #[schema(example = "Pixel 8")]
    pub name: String,

    /// Signal strength in dBm.
    #[schema(example = -48)]
    pub rssi: i16,

    /// Advertising payload as byte-grouped hex.
    #[schema(example = "02 01 06 ")]
    pub advertisement: String,

    /// Scan response payload as byte-grouped hex.
    #[serde(rename = "scanresponse")]
    #[schema(example = "")]
    pub scan_response: String,
}

impl DeviceView {
    /// Build the client view of `record` as seen at `now`.
    #[must_use]
    pub fn from_record(record: DeviceRecord, now: DateTime<Utc>) -> Self {
        let since = (now - record.last_seen).num_seconds();
        Self {
            address: record.address,
            detected: record.last_seen,
            since: since.to_string(),
            name: record.name,
            rssi: record.rssi,
            advertisement: record.advertisement,
            scan_response: record.scan_response,
        }
    }
}

/// Whether a scan session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// No scan loop is running.
    Idle,
    /// A scan loop is running (possibly finishing its last window after a stop).
    Scanning,
}

impl ScanState {
    pub(crate) const fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Scanning => 1,
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Scanning,
            _ => Self::Idle,
        }
    }

    /// Returns `true` for [`ScanState::Scanning`].
    #[must_use]
    pub const fn is_scanning(self) -> bool {
        matches!(self, Self::Scanning)
    }
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Scanning => f.write_str("scanning"),
        }
    }
}

/// Point-in-time view of the scan controller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "state": "scanning",
    "window_secs": 5.0,
    "source": "bluez",
    "session_id": "0194b2f4-6f3c-7b52-9a7e-3f1d2c4b5a69",
    "session_started_at": "2025-01-15T03:30:00Z",
    "windows_completed": 12,
    "stop_requested": false
}))]
pub struct ScanStatus {
    /// Current controller state.
    pub state: ScanState,

    /// Configured length of one scan window.
    #[schema(example = 5.0)]
    pub window_secs: f64,

    /// Name of the advertisement source.
    #[schema(example = "bluez")]
    pub source: String,

    /// Identifier of the current (or most recent) session.
    pub session_id: Option<Uuid>,

    /// When the current (or most recent) session started.
    pub session_started_at: Option<DateTime<Utc>>,

    /// Windows finished in the current (or most recent) session.
    #[schema(example = 12)]
    pub windows_completed: u64,

    /// Whether a stop has been requested for the running session.
    pub stop_requested: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(last_seen: DateTime<Utc>) -> DeviceRecord {
        DeviceRecord {
            address: "AA:BB:CC:DD:EE:FF".into(),
            last_seen,
            name: "Pixel 8".into(),
            rssi: -48,
            advertisement: "02 01 06 ".into(),
            scan_response: String::new(),
        }
    }

    #[test]
    fn test_view_since_truncates_to_whole_seconds() {
        let now = Utc::now();
        let view = DeviceView::from_record(
            record(now - chrono::Duration::milliseconds(4_900)),
            now,
        );
        assert_eq!(view.since, "4");
    }

    #[test]
    fn test_view_serializes_external_field_names() {
        let now = Utc::now();
        let json = serde_json::to_value(DeviceView::from_record(record(now), now)).unwrap();
        for key in [
            "address",
            "detected",
            "since",
            "name",
            "rssi",
            "advertisement",
            "scanresponse",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["rssi"], -48);
    }

    #[test]
    fn test_scan_state_round_trips_through_u8() {
        for state in [ScanState::Idle, ScanState::Scanning] {
            assert_eq!(ScanState::from_u8(state.as_u8()), state);
        }
        assert_eq!(ScanState::Scanning.to_string(), "scanning");
        assert_eq!(
            serde_json::to_string(&ScanState::Idle).unwrap(),
            "\"idle\""
        );
    }
}
