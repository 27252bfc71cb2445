//! Bluetooth Low Energy advertisement sources.
//!
//! This module provides:
//! - [`AdvertisementSource`], the seam between the scan loop and the radio
//! - [`BluezSource`], which listens to BlueZ discovery through `bluer` (feature `bluetooth`)
//! - [`SimulatedSource`], which emits synthetic advertisements for demos and tests
//!
//! A source is driven one window at a time. It calls the sink for every advertisement it
//! sees and returns once the window token is cancelled (or it runs out of events).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::advertisement::Advertisement;
use crate::error::Result;

/// Callback receiving each advertisement seen during a window.
pub type AdvertisementSink = dyn Fn(Advertisement) + Send + Sync;

/// Something that can listen for advertisements for one bounded window.
#[async_trait]
pub trait AdvertisementSource: Send + Sync {
    /// Short identifier used in logs and status output.
    fn name(&self) -> &'static str;

    /// Listen until `window` is cancelled, handing every advertisement to `sink`.
    ///
    /// Returning early is allowed. The caller also bounds the window with a timeout, so
    /// implementations must be cancel-safe at every await point.
    ///
    /// # Errors
    ///
    /// Returns an error if the radio cannot be driven for this window.
    async fn scan(&self, window: CancellationToken, sink: &AdvertisementSink) -> Result<()>;
}

// ============================================================================
// Simulated source
// ============================================================================

/// A synthetic peripheral emitted by [`SimulatedSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedDevice {
    /// Device address.
    pub address: String,
    /// Broadcast name.
    pub name: Option<String>,
    /// Base signal strength; emitted values wobble a few dBm around it.
    pub rssi: i16,
    /// Advertising payload.
    pub advertising_data: Vec<u8>,
    /// Scan response payload.
    pub scan_response: Vec<u8>,
}

impl SimulatedDevice {
    /// A device with a flags-only advertising payload and no scan response.
    #[must_use]
    pub fn new(address: impl Into<String>, name: Option<&str>, rssi: i16) -> Self {
        Self {
            address: address.into(),
            name: name.map(str::to_string),
            rssi,
            advertising_data: vec![0x02, 0x01, 0x06],
            scan_response: Vec::new(),
        }
    }

    fn advertisement(&self, tick: u64) -> Advertisement {
        // Deterministic wobble in [-3, 3] dBm.
        let wobble = i16::try_from(tick % 7).unwrap_or_default() - 3;
        Advertisement {
            address: self.address.clone(),
            local_name: self.name.clone(),
            rssi: self.rssi.saturating_add(wobble),
            advertising_data: self.advertising_data.clone(),
            scan_response: self.scan_response.clone(),
        }
    }
}

/// Emits advertisements for a fixed set of devices in rotation.
#[derive(Debug)]
pub struct SimulatedSource {
    devices: Vec<SimulatedDevice>,
    interval: Duration,
    tick: AtomicU64,
}

impl Default for SimulatedSource {
    fn default() -> Self {
        let mut beacon = SimulatedDevice::new("C3:5A:11:0E:92:7D", Some("Tile"), -72);
        beacon.advertising_data = vec![
            0x02, 0x01, 0x06, 0x03, 0x03, 0xed, 0xfe, 0x05, 0x09, b'T', b'i', b'l', b'e',
        ];
        let mut watch = SimulatedDevice::new("F0:99:B6:21:4C:08", Some("Forerunner 255"), -58);
        watch.scan_response = vec![0x05, 0xff, 0x87, 0x00, 0x01, 0x02];

        Self::new(vec![
            SimulatedDevice::new("4A:17:C0:3B:8E:D2", Some("Pixel 8"), -47),
            watch,
            beacon,
            SimulatedDevice::new("7E:04:AF:66:10:B9", None, -88),
            SimulatedDevice::new("D8:3A:DD:51:29:F4", Some("\u{1}LE-Bose QC45\u{0}"), -64),
        ])
    }
}

impl SimulatedSource {
    /// Rotate through `devices`, one advertisement every 100 ms.
    #[must_use]
    pub const fn new(devices: Vec<SimulatedDevice>) -> Self {
        Self {
            devices,
            interval: Duration::from_millis(100),
            tick: AtomicU64::new(0),
        }
    }

    /// Change the delay between advertisements.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait]
impl AdvertisementSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn scan(&self, window: CancellationToken, sink: &AdvertisementSink) -> Result<()> {
        if self.devices.is_empty() {
            window.cancelled().await;
            return Ok(());
        }

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                () = window.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    let tick = self.tick.fetch_add(1, Ordering::Relaxed);
                    let index = usize::try_from(tick).unwrap_or_default() % self.devices.len();
                    sink(self.devices[index].advertisement(tick));
                }
            }
        }
    }
}

// ============================================================================
// BlueZ source
// ============================================================================

#[cfg(feature = "bluetooth")]
pub use bluez::BluezSource;

#[cfg(feature = "bluetooth")]
mod bluez {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use bluer::{Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport, Session};
    use futures::{pin_mut, StreamExt};
    use tokio_util::sync::CancellationToken;
    use tracing::{debug, info, trace};

    use super::{AdvertisementSink, AdvertisementSource};
    use crate::advertisement::Advertisement;
    use crate::error::{BlueblueError, Result};

    /// AD type: Manufacturer Specific Data.
    const AD_MANUFACTURER_DATA: u8 = 0xff;
    /// AD type: Service Data, 128-bit UUID.
    const AD_SERVICE_DATA_128: u8 = 0x21;

    /// Listens to BlueZ LE discovery on the default adapter.
    pub struct BluezSource {
        // Held so the D-Bus connection outlives the adapter handle.
        _session: Session,
        adapter: Adapter,
    }

    impl std::fmt::Debug for BluezSource {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("BluezSource")
                .field("adapter", &self.adapter.name())
                .finish_non_exhaustive()
        }
    }

    impl BluezSource {
        /// Open the default adapter, power it on and configure LE discovery.
        ///
        /// # Errors
        ///
        /// Returns [`BlueblueError::BluetoothAdapterNotFound`] if bluetoothd has no adapter,
        /// or [`BlueblueError::BluetoothAdapterPoweredOff`] if it cannot be powered.
        pub async fn new() -> Result<Self> {
            let session = Session::new()
                .await
                .map_err(|e| BlueblueError::BluetoothScanFailed(e.to_string()))?;
            let adapter = session
                .default_adapter()
                .await
                .map_err(|_| BlueblueError::BluetoothAdapterNotFound)?;

            adapter
                .set_powered(true)
                .await
                .map_err(|e| BlueblueError::BluetoothAdapterPoweredOff(e.to_string()))?;

            adapter
                .set_discovery_filter(DiscoveryFilter {
                    transport: DiscoveryTransport::Le,
                    duplicate_data: true,
                    ..DiscoveryFilter::default()
                })
                .await?;

            info!(
                adapter = %adapter.name(),
                address = %adapter.address().await?,
                "Using Bluetooth adapter"
            );

            Ok(Self {
                _session: session,
                adapter,
            })
        }

        async fn read_advertisement(&self, address: Address) -> Result<Option<Advertisement>> {
            let device = self.adapter.device(address)?;

            // Cached devices without a live RSSI were not heard in this window.
            let Some(rssi) = device.rssi().await? else {
                return Ok(None);
            };

            let mut advertising_data = Vec::new();
            if let Some(fields) = device.advertising_data().await? {
                let mut fields: Vec<(u8, Vec<u8>)> = fields.into_iter().collect();
                fields.sort_by_key(|(ad_type, _)| *ad_type);
                for (ad_type, data) in fields {
                    push_ad_structure(&mut advertising_data, ad_type, &data);
                }
            }
            if let Some(manufacturer) = device.manufacturer_data().await? {
                append_manufacturer_data(&mut advertising_data, manufacturer);
            }
            if let Some(services) = device.service_data().await? {
                for (uuid, data) in services {
                    let mut payload = uuid.as_bytes().to_vec();
                    payload.reverse();
                    payload.extend_from_slice(&data);
                    push_ad_structure(&mut advertising_data, AD_SERVICE_DATA_128, &payload);
                }
            }

            Ok(Some(Advertisement {
                address: address.to_string(),
                local_name: device.name().await?,
                rssi,
                advertising_data,
                // BlueZ merges scan responses into the device properties.
                scan_response: Vec::new(),
            }))
        }
    }

    fn append_manufacturer_data(out: &mut Vec<u8>, manufacturer: HashMap<u16, Vec<u8>>) {
        let mut entries: Vec<(u16, Vec<u8>)> = manufacturer.into_iter().collect();
        entries.sort_by_key(|(company, _)| *company);
        for (company, data) in entries {
            let mut payload = company.to_le_bytes().to_vec();
            payload.extend_from_slice(&data);
            push_ad_structure(out, AD_MANUFACTURER_DATA, &payload);
        }
    }

    /// Append one length-type-value AD structure, skipping payloads too long to encode.
    fn push_ad_structure(out: &mut Vec<u8>, ad_type: u8, data: &[u8]) {
        let Ok(len) = u8::try_from(data.len() + 1) else {
            return;
        };
        out.push(len);
        out.push(ad_type);
        out.extend_from_slice(data);
    }

    #[async_trait]
    impl AdvertisementSource for BluezSource {
        fn name(&self) -> &'static str {
            "bluez"
        }

        async fn scan(&self, window: CancellationToken, sink: &AdvertisementSink) -> Result<()> {
            let events = self.adapter.discover_devices_with_changes().await?;
            pin_mut!(events);

            loop {
                tokio::select! {
                    () = window.cancelled() => break,
                    event = events.next() => match event {
                        Some(AdapterEvent::DeviceAdded(address)) => {
                            match self.read_advertisement(address).await {
                                Ok(Some(advertisement)) => sink(advertisement),
                                Ok(None) => trace!(%address, "Skipping device without RSSI"),
                                Err(e) => debug!(%address, error = %e, "Failed to read device properties"),
                            }
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
            }

            // Dropping the event stream ends this discovery session.
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_push_ad_structure() {
            let mut out = Vec::new();
            push_ad_structure(&mut out, 0x09, b"Tag");
            assert_eq!(out, vec![0x04, 0x09, b'T', b'a', b'g']);
        }

        #[test]
        fn test_manufacturer_data_is_little_endian_company_first() {
            let mut out = Vec::new();
            append_manufacturer_data(&mut out, HashMap::from([(0x004c, vec![0x02, 0x15])]));
            assert_eq!(out, vec![0x05, 0xff, 0x4c, 0x00, 0x02, 0x15]);
        }

        #[test]
        fn test_oversized_payload_is_skipped() {
            let mut out = Vec::new();
            push_ad_structure(&mut out, 0xff, &[0u8; 300]);
            assert!(out.is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[tokio::test]
    async fn test_simulated_source_emits_until_cancelled() {
        let source = SimulatedSource::new(vec![
            SimulatedDevice::new("A", Some("one"), -40),
            SimulatedDevice::new("B", None, -80),
        ])
        .with_interval(Duration::from_millis(5));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink = move |adv: Advertisement| sink_seen.lock().unwrap().push(adv);

        let window = CancellationToken::new();
        let canceller = window.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            canceller.cancel();
        });

        source.scan(window, &sink).await.unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.len() >= 2);
        assert_eq!(seen[0].address, "A");
        assert_eq!(seen[1].address, "B");
        assert!((-43..=-37).contains(&seen[0].rssi));
    }

    #[tokio::test]
    async fn test_simulated_source_without_devices_waits_for_window() {
        let source = SimulatedSource::new(Vec::new());
        let window = CancellationToken::new();
        window.cancel();
        let sink = |_: Advertisement| panic!("no devices to emit");
        source.scan(window, &sink).await.unwrap();
    }

    #[test]
    fn test_default_simulation_has_devices() {
        let source = SimulatedSource::default();
        assert_eq!(source.name(), "simulated");
        assert!(source.devices.len() >= 3);
    }
}
