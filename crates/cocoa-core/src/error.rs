//! Unified error types for the cocoa-checker core library.
//!
//! [`CheckerError`] covers every failure mode the application reports.
//! Module-specific errors ([`ConfigError`](crate::config::ConfigError),
//! [`BluetoothError`](crate::bluetooth::BluetoothError)) convert into it.
//!
//! # Error classes
//!
//! - **Precondition failures**: reported once, end the current run
//! - **Session failures**: the user may start another scan
//! - **Ambient failures**: configuration and I/O
//!
//! # Example
//!
//! ```rust
//! use cocoa_core::error::{CheckerError, Result};
//!
//! fn require_radio(powered: bool) -> Result<()> {
//!     if !powered {
//!         return Err(CheckerError::BluetoothDisabled);
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_radio(false).unwrap_err().is_precondition_failure());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all cocoa-checker operations.
#[derive(Debug, Error)]
pub enum CheckerError {
    // =========================================================================
    // PRECONDITION FAILURES
    // =========================================================================
    /// The device has no Bluetooth Low Energy capability.
    #[error("This device does not support Bluetooth Low Energy.")]
    BleUnsupported,

    /// BLE hardware is present but the radio is switched off.
    #[error("Bluetooth is turned off. Turn it on (e.g. 'bluetoothctl power on') and relaunch.")]
    BluetoothDisabled,

    /// Permission to scan was not granted.
    #[error("Permission to scan for Bluetooth devices was denied. Grant it and relaunch.")]
    PermissionDenied,

    // =========================================================================
    // SESSION FAILURES
    // =========================================================================
    /// The scan subscription could not be started.
    #[error("Bluetooth scan could not be started: {0}")]
    ScanStartFailure(String),

    /// The scan subscription ended before the scan window closed.
    #[error("Bluetooth scan was interrupted before it finished")]
    ScanInterrupted,

    /// A scan is already in progress on the radio.
    #[error("A scan is already running")]
    ScanAlreadyRunning,

    /// The session was cancelled before its summary was produced.
    #[error("Scan was cancelled")]
    Cancelled,

    /// The scan window must be longer than zero.
    #[error("Scan window must be at least one second")]
    InvalidScanWindow,

    /// The session task stopped without producing a result.
    #[error("Scan session failed: {0}")]
    SessionTaskFailed(String),

    // =========================================================================
    // CONFIGURATION & I/O ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for cocoa-checker operations.
pub type Result<T> = std::result::Result<T, CheckerError>;

impl CheckerError {
    /// Returns `true` for failures of the precondition gate.
    #[inline]
    #[must_use]
    pub const fn is_precondition_failure(&self) -> bool {
        matches!(
            self,
            Self::BleUnsupported | Self::BluetoothDisabled | Self::PermissionDenied
        )
    }

    /// Returns `true` if the user can simply start another scan.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ScanStartFailure(_)
                | Self::ScanInterrupted
                | Self::ScanAlreadyRunning
                | Self::Cancelled
                | Self::SessionTaskFailed(_)
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns a machine-readable error code for logs.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BleUnsupported => "BLE_UNSUPPORTED",
            Self::BluetoothDisabled => "BLUETOOTH_DISABLED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ScanStartFailure(_) => "SCAN_START_FAILURE",
            Self::ScanInterrupted => "SCAN_INTERRUPTED",
            Self::ScanAlreadyRunning => "SCAN_ALREADY_RUNNING",
            Self::Cancelled => "CANCELLED",
            Self::InvalidScanWindow => "INVALID_SCAN_WINDOW",
            Self::SessionTaskFailed(_) => "SESSION_TASK_FAILED",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }

    /// Short message suitable for the screen.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::BleUnsupported => "Not available on devices without BLE".to_string(),
            Self::BluetoothDisabled => "Please enable Bluetooth".to_string(),
            Self::PermissionDenied => "Bluetooth scan permission is required".to_string(),
            Self::ScanStartFailure(_) | Self::ScanInterrupted => {
                "Scan failed. Press Enter to try again".to_string()
            }
            other => other.to_string(),
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for CheckerError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::ReadError { source, .. } => Self::IoError(source),
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
        }
    }
}

impl From<crate::bluetooth::BluetoothError> for CheckerError {
    fn from(err: crate::bluetooth::BluetoothError) -> Self {
        use crate::bluetooth::BluetoothError;
        match err {
            BluetoothError::AdapterNotFound => Self::BleUnsupported,
            BluetoothError::AdapterPoweredOff => Self::BluetoothDisabled,
            BluetoothError::PermissionDenied => Self::PermissionDenied,
            BluetoothError::ScanAlreadyRunning => Self::ScanAlreadyRunning,
            BluetoothError::DiscoveryFailed { message } => Self::ScanStartFailure(message),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::BluetoothError;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_precondition_classification() {
        assert!(CheckerError::BleUnsupported.is_precondition_failure());
        assert!(CheckerError::BluetoothDisabled.is_precondition_failure());
        assert!(CheckerError::PermissionDenied.is_precondition_failure());

        assert!(!CheckerError::ScanStartFailure("busy".into()).is_precondition_failure());
        assert!(!CheckerError::BleUnsupported.is_recoverable());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(CheckerError::ScanStartFailure("throttled".into()).is_recoverable());
        assert!(CheckerError::ScanInterrupted.is_recoverable());
        assert!(CheckerError::ScanAlreadyRunning.is_recoverable());
        assert!(CheckerError::Cancelled.is_recoverable());

        assert!(!CheckerError::PermissionDenied.is_recoverable());
        assert!(!CheckerError::ConfigParseError("x".into()).is_recoverable());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(CheckerError::ConfigNotFound(PathBuf::from("/test")).is_config_error());
        assert!(CheckerError::ConfigParseError("syntax error".into()).is_config_error());
        assert!(CheckerError::ConfigValidationError("bad level".into()).is_config_error());
        assert!(!CheckerError::BluetoothDisabled.is_config_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CheckerError::BleUnsupported.error_code(), "BLE_UNSUPPORTED");
        assert_eq!(
            CheckerError::ScanStartFailure(String::new()).error_code(),
            "SCAN_START_FAILURE"
        );
        assert_eq!(
            CheckerError::ConfigNotFound(PathBuf::new()).error_code(),
            "CONFIG_NOT_FOUND"
        );
    }

    #[test]
    fn test_from_bluetooth_error() {
        let err: CheckerError = BluetoothError::DiscoveryFailed {
            message: "org.bluez.Error.InProgress".into(),
        }
        .into();
        assert!(matches!(err, CheckerError::ScanStartFailure(ref m) if m.contains("InProgress")));

        let err: CheckerError = BluetoothError::AdapterPoweredOff.into();
        assert!(matches!(err, CheckerError::BluetoothDisabled));

        let err: CheckerError = BluetoothError::ScanAlreadyRunning.into();
        assert!(matches!(err, CheckerError::ScanAlreadyRunning));
    }

    #[test]
    fn test_from_config_load_failures() {
        use crate::config::AppConfig;
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[logging]\nlevel = \"loud\"\n").unwrap();
        let err = CheckerError::from(AppConfig::load_from(file.path()).unwrap_err());
        assert!(err.is_config_error());
        assert!(matches!(err, CheckerError::ConfigValidationError(ref m) if m.starts_with("logging.level")));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[logging\n").unwrap();
        let err = CheckerError::from(AppConfig::load_from(file.path()).unwrap_err());
        assert_eq!(err.error_code(), "CONFIG_PARSE_ERROR");

        let dir = tempfile::tempdir().unwrap();
        let err = CheckerError::from(AppConfig::load_from(dir.path().join("none.toml")).unwrap_err());
        assert!(matches!(err, CheckerError::ConfigNotFound(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoErr::new(ErrorKind::NotFound, "file not found");
        let err: CheckerError = io_err.into();
        assert!(matches!(err, CheckerError::IoError(_)));
    }

    #[test]
    fn test_user_messages() {
        assert!(CheckerError::BluetoothDisabled
            .user_message()
            .contains("enable Bluetooth"));
        assert!(CheckerError::ScanInterrupted
            .user_message()
            .contains("try again"));
        assert!(CheckerError::ScanStartFailure("x".into())
            .to_string()
            .contains("could not be started"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<CheckerError>();
        assert_sync::<CheckerError>();
    }
}
