//! # blueblue-core
//!
//! Core pipeline for the blueblue live Bluetooth LE device view.
//!
//! This crate provides:
//! - Advertisement sources (BlueZ via `bluer`, plus a simulated source)
//! - A concurrent registry of last-seen devices keyed by address
//! - A single-flight scan controller that drives the source in fixed windows
//! - A query service producing a fresh, RSSI-ranked device list
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`advertisement`] - Raw advertisement records and display normalization
//! - [`bluetooth`] - The [`AdvertisementSource`] seam and its implementations
//! - [`registry`] - Last-observation-wins device store
//! - [`scanner`] - Background scan loop with start/stop guards
//! - [`query`] - Freshness filtering and signal-strength ranking
//! - [`config`] - Layered configuration (defaults, file, environment)
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod advertisement;
pub mod bluetooth;
pub mod config;
pub mod error;
pub mod query;
pub mod registry;
pub mod scanner;
pub mod types;

// Re-export primary types for convenience
pub use advertisement::{clean, format_hex, Advertisement};
#[cfg(feature = "bluetooth")]
pub use bluetooth::BluezSource;
pub use bluetooth::{AdvertisementSink, AdvertisementSource, SimulatedDevice, SimulatedSource};
pub use config::{Config, LoggingConfig, ScanConfig, ServerConfig};
pub use error::{BlueblueError, Error, Result};
pub use query::{QueryService, FRESHNESS_WINDOW_SECS};
pub use registry::Registry;
pub use scanner::ScanController;
pub use types::{DeviceRecord, DeviceView, ScanState, ScanStatus};
