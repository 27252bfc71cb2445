//! Freshness filtering and signal-strength ranking.
//!
//! The query path turns a registry snapshot into the live device list: anything not seen
//! within the last [`FRESHNESS_WINDOW_SECS`] seconds is dropped and the rest is ordered
//! strongest signal first.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::registry::Registry;
use crate::types::DeviceView;

/// Devices not seen for this many seconds are left out of query results.
pub const FRESHNESS_WINDOW_SECS: i64 = 60;

/// Read path over the shared [`Registry`].
#[derive(Debug, Clone)]
pub struct QueryService {
    registry: Arc<Registry>,
    evict_stale: bool,
}

impl QueryService {
    /// Create a query service over `registry`.
    ///
    /// With `evict_stale` set, each query also removes stale entries from the registry.
    #[must_use]
    pub const fn new(registry: Arc<Registry>, evict_stale: bool) -> Self {
        Self {
            registry,
            evict_stale,
        }
    }

    /// Fresh devices ranked by signal strength, as of now.
    #[must_use]
    pub fn devices(&self) -> Vec<DeviceView> {
        self.devices_at(Utc::now())
    }

    /// Fresh devices ranked by signal strength, as of `now`.
    ///
    /// A device is fresh when it was seen after `now - 60s`; one seen exactly 60 seconds
    /// ago is already stale. Devices with equal RSSI keep their snapshot order.
    #[must_use]
    pub fn devices_at(&self, now: DateTime<Utc>) -> Vec<DeviceView> {
        let cutoff = freshness_cutoff(now);

        if self.evict_stale {
            let evicted = self.registry.evict_older_than(cutoff + Duration::nanoseconds(1));
            if evicted > 0 {
                debug!(evicted, "Evicted stale devices from registry");
            }
        }

        let mut devices: Vec<DeviceView> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|record| record.last_seen > cutoff)
            .map(|record| DeviceView::from_record(record, now))
            .collect();

        // `sort_by` is stable
        devices.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        devices
    }

    /// The registry this service reads from.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

/// Oldest `last_seen` that is already too old to be shown at `now`.
#[must_use]
pub fn freshness_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::seconds(FRESHNESS_WINDOW_SECS)
}
