//! Precondition checks that must pass before a scan may be started.
//!
//! The checks run in a fixed order and stop at the first failure:
//!
//! 1. BLE hardware is present
//! 2. The Bluetooth radio is switched on
//! 3. The process is allowed to scan

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{CheckerError, Result};

/// Host state the gate depends on.
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    /// Whether the host has BLE capability at all.
    async fn supports_ble(&self) -> bool;

    /// Whether the Bluetooth radio is powered.
    async fn is_bluetooth_enabled(&self) -> bool;

    /// Whether the process may read advertisement contents.
    ///
    /// Backends without a permission query may probe by configuring the
    /// adapter; the BlueZ backend writes the LE discovery filter here.
    async fn has_scan_permission(&self) -> bool;

    /// Ask for the scan permission. Returns `true` if it was granted.
    async fn request_scan_permission(&self) -> bool;
}

/// Outcome of [`check_preconditions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateResult {
    /// No BLE hardware.
    BleUnsupported,
    /// BLE hardware present, radio off.
    BluetoothDisabled,
    /// Permission must be requested before scanning.
    PermissionRequired,
    /// Scanning may start.
    Ready,
}

impl GateResult {
    /// Returns `true` if this result ends the current run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::BleUnsupported | Self::BluetoothDisabled)
    }
}

/// Check the preconditions in order, reporting the first one that fails.
///
/// Only queries host state; safe to call repeatedly.
pub async fn check_preconditions<H>(host: &H) -> GateResult
where
    H: HostEnvironment + ?Sized,
{
    let result = if !host.supports_ble().await {
        GateResult::BleUnsupported
    } else if !host.is_bluetooth_enabled().await {
        GateResult::BluetoothDisabled
    } else if !host.has_scan_permission().await {
        GateResult::PermissionRequired
    } else {
        GateResult::Ready
    };

    info!(?result, "Precondition check");
    result
}

/// Run the gate to completion, requesting the permission if needed.
///
/// # Errors
///
/// Returns the precondition failure that blocks scanning:
/// [`CheckerError::BleUnsupported`], [`CheckerError::BluetoothDisabled`] or
/// [`CheckerError::PermissionDenied`].
pub async fn resolve_preconditions<H>(host: &H) -> Result<()>
where
    H: HostEnvironment + ?Sized,
{
    match check_preconditions(host).await {
        GateResult::Ready => Ok(()),
        GateResult::BleUnsupported => Err(CheckerError::BleUnsupported),
        GateResult::BluetoothDisabled => Err(CheckerError::BluetoothDisabled),
        GateResult::PermissionRequired => {
            info!("Requesting scan permission");
            if host.request_scan_permission().await {
                info!("Scan permission granted");
                Ok(())
            } else {
                warn!("Scan permission denied");
                Err(CheckerError::PermissionDenied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::MockHost;

    #[tokio::test]
    async fn test_ready_host() {
        let host = MockHost::ready();
        assert_eq!(check_preconditions(&host).await, GateResult::Ready);
        assert!(resolve_preconditions(&host).await.is_ok());
        assert_eq!(host.permission_requests(), 0);
    }

    #[tokio::test]
    async fn test_checks_run_in_order() {
        // Every condition fails; hardware support is reported first.
        let host = MockHost::ready()
            .without_ble()
            .with_bluetooth_disabled()
            .without_permission(false);
        assert_eq!(check_preconditions(&host).await, GateResult::BleUnsupported);

        let host = MockHost::ready()
            .with_bluetooth_disabled()
            .without_permission(false);
        assert_eq!(
            check_preconditions(&host).await,
            GateResult::BluetoothDisabled
        );

        let host = MockHost::ready().without_permission(false);
        assert_eq!(
            check_preconditions(&host).await,
            GateResult::PermissionRequired
        );
    }

    #[tokio::test]
    async fn test_check_is_idempotent() {
        let host = MockHost::ready().without_permission(true);
        for _ in 0..3 {
            assert_eq!(
                check_preconditions(&host).await,
                GateResult::PermissionRequired
            );
        }
        assert_eq!(host.permission_requests(), 0);
    }

    #[tokio::test]
    async fn test_permission_granted_on_request() {
        let host = MockHost::ready().without_permission(true);
        assert!(resolve_preconditions(&host).await.is_ok());
        assert_eq!(host.permission_requests(), 1);
        assert_eq!(check_preconditions(&host).await, GateResult::Ready);
    }

    #[tokio::test]
    async fn test_permission_denied_blocks() {
        let host = MockHost::ready().without_permission(false);
        let err = resolve_preconditions(&host).await.unwrap_err();
        assert!(matches!(err, CheckerError::PermissionDenied));
        assert_eq!(host.permission_requests(), 1);
    }

    #[tokio::test]
    async fn test_terminal_failures_map_to_errors() {
        let err = resolve_preconditions(&MockHost::ready().without_ble())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckerError::BleUnsupported));

        let err = resolve_preconditions(&MockHost::ready().with_bluetooth_disabled())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckerError::BluetoothDisabled));

        assert!(GateResult::BleUnsupported.is_terminal());
        assert!(GateResult::BluetoothDisabled.is_terminal());
        assert!(!GateResult::PermissionRequired.is_terminal());
    }
}
