//! Host and radio selection for the build's Bluetooth backend.

use std::sync::Arc;

use cocoa_core::{BluetoothConfig, HostEnvironment, RadioHandle};

#[cfg(not(any(feature = "bluetooth", feature = "mock-bluetooth")))]
compile_error!("enable the `bluetooth` or `mock-bluetooth` feature");

/// Connect to BlueZ. The adapter serves as both the gate's host and the radio.
#[cfg(feature = "bluetooth")]
pub async fn connect(config: &BluetoothConfig) -> (Arc<dyn HostEnvironment>, RadioHandle) {
    let radio = Arc::new(cocoa_core::BluezRadio::connect(config.adapter.as_deref()).await);
    let host: Arc<dyn HostEnvironment> = radio.clone();
    (host, RadioHandle::from_arc(radio))
}

/// Without a real backend the host reports no BLE support, so the gate
/// stops before any scan.
#[cfg(all(not(feature = "bluetooth"), feature = "mock-bluetooth"))]
pub async fn connect(_config: &BluetoothConfig) -> (Arc<dyn HostEnvironment>, RadioHandle) {
    tracing::warn!("Built without the bluetooth feature; no radio available");
    let host: Arc<dyn HostEnvironment> = Arc::new(cocoa_core::MockHost::ready().without_ble());
    (host, RadioHandle::new(cocoa_core::MockRadio::new()))
}
