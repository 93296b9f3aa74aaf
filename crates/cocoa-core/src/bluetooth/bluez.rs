//! BlueZ backend built on `bluer`.

use async_trait::async_trait;
use bluer::{
    Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport, ErrorKind, Session,
};
use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{AdvertisementStream, BluetoothError, BluetoothResult, Radio};
use crate::advertisement::AdvertisementObservation;
use crate::gate::HostEnvironment;

/// A BlueZ adapter used both as the gate's host and as the scan radio.
pub struct BluezRadio {
    _session: Option<Session>,
    adapter: Option<Adapter>,
}

impl BluezRadio {
    /// Connect to the Bluetooth daemon and pick an adapter.
    ///
    /// A missing daemon or adapter is not an error here; it surfaces
    /// through [`HostEnvironment::supports_ble`] instead.
    ///
    /// # Arguments
    ///
    /// * `adapter_name` - Adapter to use (e.g. `hci0`), or the default adapter when `None`
    pub async fn connect(adapter_name: Option<&str>) -> Self {
        let session = match Session::new().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Cannot reach bluetoothd");
                return Self {
                    _session: None,
                    adapter: None,
                };
            }
        };

        let adapter = match adapter_name {
            Some(name) => match session.adapter_names().await {
                Ok(names) if names.iter().any(|n| n == name) => session.adapter(name).ok(),
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "Cannot list Bluetooth adapters");
                    None
                }
            },
            None => session.default_adapter().await.ok(),
        };

        match &adapter {
            Some(adapter) => info!(adapter = adapter.name(), "Using Bluetooth adapter"),
            None => warn!(requested = ?adapter_name, "No Bluetooth adapter available"),
        }

        Self {
            _session: Some(session),
            adapter,
        }
    }

    fn adapter(&self) -> BluetoothResult<&Adapter> {
        self.adapter.as_ref().ok_or(BluetoothError::AdapterNotFound)
    }

    async fn apply_le_filter(&self) -> BluetoothResult<()> {
        let filter = DiscoveryFilter {
            transport: DiscoveryTransport::Le,
            duplicate_data: true,
            ..Default::default()
        };

        self.adapter()?
            .set_discovery_filter(filter)
            .await
            .map_err(|e| match e.kind {
                ErrorKind::NotAuthorized | ErrorKind::NotPermitted => {
                    BluetoothError::PermissionDenied
                }
                ErrorKind::NotReady => BluetoothError::AdapterPoweredOff,
                _ => BluetoothError::DiscoveryFailed {
                    message: e.to_string(),
                },
            })
    }
}

/// Order a device's service UUIDs ascending.
///
/// BlueZ reports them as a set, so this keeps the first entry stable
/// across events for the same device.
fn sorted_service_uuids(uuids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut uuids: Vec<Uuid> = uuids.into_iter().collect();
    uuids.sort_unstable();
    uuids
}

/// Read the current advertisement state of a device.
async fn observe(adapter: &Adapter, address: Address) -> Option<AdvertisementObservation> {
    let device = adapter.device(address).ok()?;

    let rssi = match device.rssi().await {
        Ok(Some(rssi)) => rssi,
        Ok(None) => return None,
        Err(e) => {
            debug!(%address, error = %e, "RSSI unavailable");
            return None;
        }
    };

    let service_uuids = sorted_service_uuids(device.uuids().await.ok().flatten().unwrap_or_default());

    Some(AdvertisementObservation::new(
        address.to_string(),
        service_uuids,
        rssi,
    ))
}

#[async_trait]
impl Radio for BluezRadio {
    async fn start_scan(&self) -> BluetoothResult<AdvertisementStream> {
        let adapter = self.adapter()?.clone();
        self.apply_le_filter().await?;

        let events = adapter
            .discover_devices_with_changes()
            .await
            .map_err(|e| BluetoothError::DiscoveryFailed {
                message: e.to_string(),
            })?;
        info!(adapter = adapter.name(), "LE discovery started");

        let stream = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                // With changes enabled, bluer re-emits DeviceAdded whenever a
                // known device's properties (RSSI, UUIDs) change.
                match event {
                    AdapterEvent::DeviceAdded(address) => observe(&adapter, address).await,
                    _ => None,
                }
            }
        });

        Ok(stream.boxed())
    }
}

#[async_trait]
impl HostEnvironment for BluezRadio {
    async fn supports_ble(&self) -> bool {
        self.adapter.is_some()
    }

    async fn is_bluetooth_enabled(&self) -> bool {
        let Ok(adapter) = self.adapter() else {
            return false;
        };
        match adapter.is_powered().await {
            Ok(powered) => powered,
            Err(e) => {
                warn!(error = %e, "Cannot read adapter power state");
                false
            }
        }
    }

    async fn has_scan_permission(&self) -> bool {
        match self.apply_le_filter().await {
            Ok(()) => true,
            Err(BluetoothError::PermissionDenied) => false,
            Err(e) => {
                warn!(error = %e, "Discovery filter rejected");
                false
            }
        }
    }

    async fn request_scan_permission(&self) -> bool {
        // BlueZ has no runtime prompt; access is granted by D-Bus policy.
        warn!(
            "Scanning requires access to org.bluez over D-Bus; add the user to the \
             'bluetooth' group or adjust the bluetoothd policy, then relaunch"
        );
        self.has_scan_permission().await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::advertisement::COCOA_SERVICE_UUID;

    const BATTERY_SERVICE: Uuid = Uuid::from_u128(0x0000_180f_0000_1000_8000_0080_5f9b_34fb);
    const VENDOR_SERVICE: Uuid = Uuid::from_u128(0xf000_aa00_0451_4000_b000_0000_0000_0000);

    #[test]
    fn test_service_uuids_sorted_ascending() {
        let set: HashSet<Uuid> = [VENDOR_SERVICE, COCOA_SERVICE_UUID, BATTERY_SERVICE]
            .into_iter()
            .collect();

        let uuids = sorted_service_uuids(set);
        assert_eq!(uuids, vec![BATTERY_SERVICE, COCOA_SERVICE_UUID, VENDOR_SERVICE]);
    }

    #[test]
    fn test_smaller_uuid_hides_cocoa_service() {
        let uuids = sorted_service_uuids([COCOA_SERVICE_UUID, BATTERY_SERVICE]);
        let observation = AdvertisementObservation::new("AA", uuids, -60);
        assert!(!observation.matches_service(&COCOA_SERVICE_UUID));

        let uuids = sorted_service_uuids([VENDOR_SERVICE, COCOA_SERVICE_UUID]);
        let observation = AdvertisementObservation::new("AA", uuids, -60);
        assert!(observation.matches_service(&COCOA_SERVICE_UUID));
    }

    #[test]
    fn test_no_service_uuids() {
        assert!(sorted_service_uuids(HashSet::<Uuid>::new()).is_empty());
    }
}
