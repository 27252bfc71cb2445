//! Last-observation-wins device store.
//!
//! The registry is a map from device address to its latest [`DeviceRecord`], guarded by a
//! single `RwLock`. Writers replace whole records; readers copy the map out so no lock is
//! held while the caller filters, sorts or renders.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::types::DeviceRecord;

/// Concurrent map of device address to most recent observation.
#[derive(Debug, Default)]
pub struct Registry {
    devices: RwLock<HashMap<String, DeviceRecord>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record`, replacing any previous record for the same address.
    pub fn upsert(&self, record: DeviceRecord) {
        self.devices.write().insert(record.address.clone(), record);
    }

    /// Copy out every record currently held.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.devices.read().values().cloned().collect()
    }

    /// Look up the record for one address.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<DeviceRecord> {
        self.devices.read().get(address).cloned()
    }

    /// Number of distinct addresses held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Returns `true` if no device has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Remove every record last seen strictly before `cutoff`, returning how many were dropped.
    pub fn evict_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut devices = self.devices.write();
        let before = devices.len();
        devices.retain(|_, record| record.last_seen >= cutoff);
        before - devices.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;

    fn record(address: &str, rssi: i16, last_seen: DateTime<Utc>) -> DeviceRecord {
        DeviceRecord {
            address: address.to_string(),
            last_seen,
            name: format!("dev-{address}"),
            rssi,
            advertisement: String::new(),
            scan_response: String::new(),
        }
    }

    #[test]
    fn test_last_write_wins_per_address() {
        let registry = Registry::new();
        let now = Utc::now();

        registry.upsert(record("A", -70, now));
        registry.upsert(record("B", -50, now));
        registry.upsert(record("A", -40, now + Duration::seconds(1)));
        registry.upsert(record("C", -90, now));
        registry.upsert(record("B", -55, now + Duration::seconds(2)));

        let mut snapshot = registry.snapshot();
        snapshot.sort_by(|a, b| a.address.cmp(&b.address));

        assert_eq!(
            snapshot,
            vec![
                record("A", -40, now + Duration::seconds(1)),
                record("B", -55, now + Duration::seconds(2)),
                record("C", -90, now),
            ]
        );
    }

    #[test]
    fn test_overwrite_replaces_every_field() {
        let registry = Registry::new();
        let now = Utc::now();

        let mut first = record("A", -70, now);
        first.name = "Old Name".into();
        first.scan_response = "de ad ".into();
        registry.upsert(first);

        let second = record("A", -60, now);
        registry.upsert(second.clone());

        assert_eq!(registry.get("A"), Some(second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_last_write_wins_even_with_older_timestamp() {
        let registry = Registry::new();
        let now = Utc::now();

        registry.upsert(record("A", -40, now));
        registry.upsert(record("A", -80, now - Duration::seconds(30)));

        assert_eq!(registry.get("A").map(|r| r.rssi), Some(-80));
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let registry = Registry::new();
        let now = Utc::now();
        for (i, addr) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            registry.upsert(record(addr, -(i as i16) * 10, now));
        }

        assert_eq!(registry.snapshot(), registry.snapshot());
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let registry = Registry::new();
        let now = Utc::now();
        registry.upsert(record("A", -40, now));

        let snapshot = registry.snapshot();
        registry.upsert(record("A", -99, now));
        registry.upsert(record("B", -10, now));

        assert_eq!(snapshot, vec![record("A", -40, now)]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
        assert_eq!(registry.get("A"), None);
    }

    #[test]
    fn test_evict_older_than() {
        let registry = Registry::new();
        let now = Utc::now();
        registry.upsert(record("old", -40, now - Duration::seconds(120)));
        registry.upsert(record("edge", -40, now - Duration::seconds(60)));
        registry.upsert(record("new", -40, now));

        let removed = registry.evict_older_than(now - Duration::seconds(60));

        assert_eq!(removed, 1);
        assert!(registry.get("old").is_none());
        assert!(registry.get("edge").is_some());
        assert!(registry.get("new").is_some());
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let registry = Arc::new(Registry::new());
        let now = Utc::now();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..250_i16 {
                        registry.upsert(record(&format!("dev-{}", i % 50), w * 1000 + i, now));
                    }
                })
            })
            .collect();

        let reader = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let snapshot = registry.snapshot();
                    assert!(snapshot.len() <= 50);
                }
            })
        };

        for handle in writers {
            handle.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(registry.len(), 50);
    }
}
