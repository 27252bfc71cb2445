//! Unified error types for the blueblue core library.
//!
//! This module provides a unified error type [`BlueblueError`] that covers all failure
//! modes across the scan pipeline: acquiring the radio, running scan windows,
//! start/stop conflicts on the scan controller, and configuration loading.
//!
//! # Design Principles
//!
//! - **Specific variants**: Each error variant captures exactly one failure mode
//! - **Actionable messages**: Error messages guide users toward resolution
//! - **HTTP-ready**: Error types include HTTP status codes and error codes
//!
//! # Example
//!
//! ```rust
//! use blueblue_core::error::{BlueblueError, Result};
//!
//! fn require_positive(window_secs: f64) -> Result<()> {
//!     if window_secs <= 0.0 {
//!         return Err(BlueblueError::ConfigValidationError(
//!             "scan.window_secs must be positive".into(),
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all blueblue operations.
#[derive(Debug, Error)]
pub enum BlueblueError {
    // =========================================================================
    // BLUETOOTH ERRORS
    // =========================================================================
    /// No Bluetooth adapter was found on this system.
    #[error(
        "No Bluetooth adapter found. Ensure Bluetooth hardware is present and bluetoothd is running."
    )]
    BluetoothAdapterNotFound,

    /// The adapter exists but could not be powered on.
    #[error("Bluetooth adapter could not be powered on: {0}")]
    BluetoothAdapterPoweredOff(String),

    /// This binary was built without radio support.
    #[error("Bluetooth support is not compiled in. Rebuild with `--features bluetooth` or run with `--simulate`.")]
    BluetoothSupportDisabled,

    /// A scan window failed inside the advertisement source.
    #[error("Bluetooth scan failed: {0}")]
    BluetoothScanFailed(String),

    // =========================================================================
    // SCAN CONTROL CONFLICTS
    // =========================================================================
    /// A start was requested while a scan session is running.
    #[error("A scan is already in progress")]
    AlreadyScanning,

    /// A stop was requested while no scan session is running.
    #[error("No scan is in progress")]
    NotScanning,

    /// A stop was requested after an earlier stop; the loop is finishing its last window.
    #[error("Stop already requested; the current scan window is finishing")]
    StopAlreadyRequested,

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration could not be parsed or merged.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // I/O ERRORS
    // =========================================================================
    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for blueblue operations.
pub type Result<T> = std::result::Result<T, BlueblueError>;

/// Short alias for [`BlueblueError`].
pub type Error = BlueblueError;

impl BlueblueError {
    /// Returns `true` if this error is a start/stop state conflict.
    #[inline]
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyScanning | Self::NotScanning | Self::StopAlreadyRequested
        )
    }

    /// Returns `true` if the scan loop can carry on past this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::BluetoothScanFailed(_))
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 409 Conflict - scan state does not allow the transition
            Self::AlreadyScanning | Self::NotScanning | Self::StopAlreadyRequested => 409,

            // 404 Not Found
            Self::ConfigNotFound(_) => 404,

            // 422 Unprocessable Entity - semantic errors
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,

            // 500 Internal Server Error
            Self::IoError(_) => 500,

            // 503 Service Unavailable - Bluetooth hardware issues
            Self::BluetoothAdapterNotFound
            | Self::BluetoothAdapterPoweredOff(_)
            | Self::BluetoothSupportDisabled
            | Self::BluetoothScanFailed(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BluetoothAdapterNotFound => "BLUETOOTH_ADAPTER_NOT_FOUND",
            Self::BluetoothAdapterPoweredOff(_) => "BLUETOOTH_ADAPTER_POWERED_OFF",
            Self::BluetoothSupportDisabled => "BLUETOOTH_SUPPORT_DISABLED",
            Self::BluetoothScanFailed(_) => "BLUETOOTH_SCAN_FAILED",
            Self::AlreadyScanning => "ALREADY_SCANNING",
            Self::NotScanning => "NOT_SCANNING",
            Self::StopAlreadyRequested => "STOP_ALREADY_REQUESTED",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM DEPENDENCY ERRORS
// =============================================================================

impl From<::config::ConfigError> for BlueblueError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::ConfigParseError(err.to_string())
    }
}

#[cfg(feature = "bluetooth")]
impl From<bluer::Error> for BlueblueError {
    fn from(err: bluer::Error) -> Self {
        match err.kind {
            bluer::ErrorKind::NotFound => Self::BluetoothAdapterNotFound,
            _ => Self::BluetoothScanFailed(err.to_string()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
