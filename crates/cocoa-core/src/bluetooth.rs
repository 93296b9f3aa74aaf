//! Bluetooth Low Energy radio access.
//!
//! This module provides:
//! - The [`Radio`] trait, a source of advertisement observations
//! - [`RadioHandle`], an explicitly passed handle granting exclusive use of
//!   one radio's scan subscription
//! - A BlueZ backend (`bluetooth` feature) and an in-memory backend
//!   (`mock-bluetooth` feature)

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::advertisement::AdvertisementObservation;

#[cfg(feature = "bluetooth")]
mod bluez;
#[cfg(any(test, feature = "mock-bluetooth"))]
mod mock;

#[cfg(feature = "bluetooth")]
pub use bluez::BluezRadio;
#[cfg(any(test, feature = "mock-bluetooth"))]
pub use mock::{MockHost, MockRadio};

/// Errors raised by radio backends.
#[derive(Debug, Error)]
pub enum BluetoothError {
    /// No adapter is present.
    #[error("No Bluetooth adapter found")]
    AdapterNotFound,

    /// The adapter exists but is powered off.
    #[error("Bluetooth adapter is powered off")]
    AdapterPoweredOff,

    /// The host refused access to discovery.
    #[error("Not permitted to scan for Bluetooth devices")]
    PermissionDenied,

    /// Another session already holds the scan subscription.
    #[error("A scan is already running on this adapter")]
    ScanAlreadyRunning,

    /// The scan subscription could not be started.
    #[error("Failed to start discovery: {message}")]
    DiscoveryFailed {
        /// Backend error message.
        message: String,
    },
}

/// Result alias for radio operations.
pub type BluetoothResult<T> = std::result::Result<T, BluetoothError>;

/// Stream of advertisements from an active scan subscription.
///
/// Dropping the stream stops the scan.
pub type AdvertisementStream = BoxStream<'static, AdvertisementObservation>;

/// A BLE radio able to run a passive advertisement scan.
#[async_trait]
pub trait Radio: Send + Sync {
    /// Start a continuous scan, yielding every received advertisement.
    ///
    /// The stream only terminates on its own if the subscription is lost.
    async fn start_scan(&self) -> BluetoothResult<AdvertisementStream>;
}

/// Shared handle to one radio.
///
/// Cloning the handle shares the same radio and the same exclusivity
/// permit, so at most one [`RadioLease`] exists at a time across clones.
#[derive(Clone)]
pub struct RadioHandle {
    radio: Arc<dyn Radio>,
    permit: Arc<Semaphore>,
}

impl RadioHandle {
    /// Wrap a radio backend.
    pub fn new(radio: impl Radio + 'static) -> Self {
        Self::from_arc(Arc::new(radio))
    }

    /// Wrap an already shared radio backend.
    pub fn from_arc(radio: Arc<dyn Radio>) -> Self {
        Self {
            radio,
            permit: Arc::new(Semaphore::new(1)),
        }
    }

    /// Acquire exclusive use of the radio.
    ///
    /// # Errors
    ///
    /// Returns [`BluetoothError::ScanAlreadyRunning`] while another lease is alive.
    pub fn try_acquire(&self) -> BluetoothResult<RadioLease> {
        let permit = Arc::clone(&self.permit)
            .try_acquire_owned()
            .map_err(|_| BluetoothError::ScanAlreadyRunning)?;

        Ok(RadioLease {
            radio: Arc::clone(&self.radio),
            _permit: permit,
        })
    }

    /// Returns `true` if a lease is currently held.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.permit.available_permits() == 0
    }
}

impl fmt::Debug for RadioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadioHandle")
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

/// Exclusive use of a radio. Released on drop.
pub struct RadioLease {
    radio: Arc<dyn Radio>,
    _permit: OwnedSemaphorePermit,
}

impl RadioLease {
    /// Start the scan subscription on the leased radio.
    ///
    /// # Errors
    ///
    /// Propagates the backend's start failure.
    pub async fn start_scan(&self) -> BluetoothResult<AdvertisementStream> {
        self.radio.start_scan().await
    }
}

impl fmt::Debug for RadioLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadioLease").finish_non_exhaustive()
    }
}
