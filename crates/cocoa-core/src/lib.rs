//! # cocoa-core
//!
//! Core logic for cocoa-checker: a one-shot BLE scan that estimates how many
//! devices nearby are running the COCOA exposure-notification app.
//!
//! This crate provides:
//! - A precondition gate (BLE support, radio power, scan permission)
//! - A timed, cancellable scan session that counts distinct advertisers
//! - Radio backends for BlueZ and for tests
//! - Configuration loading for the ambient settings
//!
//! ## Architecture
//!
//! - [`gate`] - Ordered precondition checks and the permission request
//! - [`session`] - Scan window, collector task and summary delivery
//! - [`advertisement`] - Observations, the result set and deduplication
//! - [`bluetooth`] - Radio trait, exclusive radio handle and backends
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod advertisement;
pub mod bluetooth;
pub mod config;
pub mod error;
pub mod gate;
pub mod session;

// Re-export primary types for convenience
pub use advertisement::{
    AdvertisementObservation, ScanResultSet, SessionSummary, COCOA_SERVICE_UUID, SCAN_DURATION,
};
#[cfg(feature = "bluetooth")]
pub use bluetooth::BluezRadio;
#[cfg(any(test, feature = "mock-bluetooth"))]
pub use bluetooth::{MockHost, MockRadio};
pub use bluetooth::{
    AdvertisementStream, BluetoothError, BluetoothResult, Radio, RadioHandle, RadioLease,
};
pub use config::{AppConfig, BluetoothConfig, ConfigError, ConfigResult, LoggingConfig};
pub use error::{CheckerError, Result};
pub use gate::{check_preconditions, resolve_preconditions, GateResult, HostEnvironment};
pub use session::{ScanHandle, ScanSession, SessionPhase};
