//! Advertisement observations and the per-session result set.
//!
//! An [`AdvertisementObservation`] is one received BLE advertisement. A
//! [`ScanResultSet`] collects the observations accepted during one scan
//! window and is consumed, once the scan has stopped, into a
//! [`SessionSummary`].

use std::collections::HashSet;
use std::time::Duration;

use uuid::Uuid;

/// Exposure Notification service UUID (16-bit `0xFD6F` on the Bluetooth base UUID).
pub const COCOA_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_fd6f_0000_1000_8000_0080_5f9b_34fb);

/// Length of the scan window.
pub const SCAN_DURATION: Duration = Duration::from_secs(10);

/// A single advertisement event as reported by the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementObservation {
    /// Device address (MAC address on BlueZ).
    pub address: String,

    /// Advertised service UUIDs, in the order the radio reported them.
    pub service_uuids: Vec<Uuid>,

    /// Received signal strength in dBm.
    pub rssi: i16,
}

impl AdvertisementObservation {
    /// Create a new observation.
    pub fn new(address: impl Into<String>, service_uuids: Vec<Uuid>, rssi: i16) -> Self {
        Self {
            address: address.into(),
            service_uuids,
            rssi,
        }
    }

    /// Returns `true` if the first advertised service UUID is `filter`.
    ///
    /// Only position 0 is inspected. An advertisement listing `filter`
    /// anywhere else does not match.
    #[must_use]
    pub fn matches_service(&self, filter: &Uuid) -> bool {
        self.service_uuids.first() == Some(filter)
    }
}

/// Observations accepted during one scan window, in arrival order.
#[derive(Debug, Default)]
pub struct ScanResultSet {
    observations: Vec<AdvertisementObservation>,
}

impl ScanResultSet {
    /// Create an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation.
    pub fn push(&mut self, observation: AdvertisementObservation) {
        self.observations.push(observation);
    }

    /// Number of raw observations, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns `true` if nothing has been accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Deduplicate by device address and produce the summary.
    ///
    /// The first observation seen for an address wins and addresses keep
    /// the order in which they first appeared.
    #[must_use]
    pub fn into_summary(self) -> SessionSummary {
        let mut seen = HashSet::with_capacity(self.observations.len());
        let signal_strengths = self
            .observations
            .into_iter()
            .filter(|obs| seen.insert(obs.address.clone()))
            .map(|obs| obs.rssi)
            .collect();

        SessionSummary { signal_strengths }
    }
}

/// Result of one completed scan session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSummary {
    signal_strengths: Vec<i16>,
}

impl SessionSummary {
    /// Number of distinct devices observed.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.signal_strengths.len()
    }

    /// Signal strength (dBm) of each distinct device, in first-seen order.
    #[must_use]
    pub fn signal_strengths(&self) -> &[i16] {
        &self.signal_strengths
    }
}
