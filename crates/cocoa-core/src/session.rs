//! Timed advertisement scan.
//!
//! [`ScanSession::start`] leases the radio, starts the scan subscription and
//! returns a [`ScanHandle`] right away. A single collector task owns the
//! subscription and the [`ScanResultSet`]; when the window closes it stops
//! the scan first, then deduplicates, then delivers the summary.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, trace, warn, Instrument};
use uuid::Uuid;

use crate::advertisement::{
    ScanResultSet, SessionSummary, COCOA_SERVICE_UUID, SCAN_DURATION,
};
use crate::bluetooth::{AdvertisementStream, RadioHandle, RadioLease};
use crate::error::{CheckerError, Result};

/// Lifecycle of a running session, observable through [`ScanHandle::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// The scan subscription is active.
    Scanning,
    /// The window closed and the summary was produced.
    Completed,
    /// The session was cancelled; no summary.
    Cancelled,
    /// The subscription was lost mid-window; no summary.
    Failed,
}

/// A one-shot scan over a fixed window.
#[derive(Debug, Clone)]
pub struct ScanSession {
    radio: RadioHandle,
    window: Duration,
    service_filter: Uuid,
}

impl ScanSession {
    /// A session counting COCOA advertisements over the standard 10 second window.
    pub fn new(radio: RadioHandle) -> Self {
        Self::with_window(radio, SCAN_DURATION, COCOA_SERVICE_UUID)
    }

    /// A session with an explicit window and service filter.
    pub fn with_window(radio: RadioHandle, window: Duration, service_filter: Uuid) -> Self {
        Self {
            radio,
            window,
            service_filter,
        }
    }

    /// Start scanning and return immediately.
    ///
    /// The window is measured from the moment the subscription is up.
    ///
    /// # Errors
    ///
    /// - [`CheckerError::InvalidScanWindow`] for a window shorter than one second
    /// - [`CheckerError::ScanAlreadyRunning`] if another session holds the radio
    /// - [`CheckerError::ScanStartFailure`] if the radio refuses to scan
    pub async fn start(&self) -> Result<ScanHandle> {
        if self.window.as_secs() == 0 {
            return Err(CheckerError::InvalidScanWindow);
        }

        let lease = self.radio.try_acquire()?;
        let stream = lease.start_scan().await.map_err(|e| {
            warn!(error = %e, "Scan failed to start");
            CheckerError::ScanStartFailure(e.to_string())
        })?;

        let started_at = Instant::now();
        let deadline = started_at + self.window;
        info!(
            window_secs = self.window.as_secs(),
            service = %self.service_filter,
            "Scan started"
        );

        let cancel = CancellationToken::new();
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Scanning);
        let collector = Collector {
            stream,
            lease,
            service_filter: self.service_filter,
            deadline,
            cancel: cancel.clone(),
            phase: phase_tx,
        };
        let task = tokio::spawn(
            collector
                .run()
                .instrument(tracing::info_span!("scan_session", service = %self.service_filter)),
        );

        Ok(ScanHandle {
            task,
            phase: phase_rx,
            cancel: cancel.clone(),
            _cancel_on_drop: cancel.drop_guard(),
            started_at,
        })
    }

    /// Start a scan and wait for its summary.
    ///
    /// # Errors
    ///
    /// Any error from [`ScanSession::start`] or [`ScanHandle::summary`].
    pub async fn run(&self) -> Result<SessionSummary> {
        self.start().await?.summary().await
    }
}

/// Handle to a running session.
///
/// Dropping the handle before the summary is delivered cancels the scan.
pub struct ScanHandle {
    task: JoinHandle<Result<SessionSummary>>,
    phase: watch::Receiver<SessionPhase>,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
    started_at: Instant,
}

impl ScanHandle {
    /// Stop the scan now and suppress the summary.
    ///
    /// Has no effect once the window has closed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this session, usable after the handle has been
    /// moved into [`ScanHandle::summary`].
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Returns `true` while the scan subscription is active.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.phase() == SessionPhase::Scanning
    }

    /// Watch phase changes, e.g. to drive a busy indicator.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase.clone()
    }

    /// When the scan subscription came up.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Wait for the window to close and take the summary.
    ///
    /// # Errors
    ///
    /// - [`CheckerError::Cancelled`] if the session was cancelled
    /// - [`CheckerError::ScanInterrupted`] if the subscription ended early
    pub async fn summary(self) -> Result<SessionSummary> {
        let Self {
            task,
            _cancel_on_drop: guard,
            ..
        } = self;

        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(CheckerError::SessionTaskFailed(e.to_string())),
        };
        drop(guard);
        result
    }
}

enum StopReason {
    WindowElapsed,
    Cancelled,
    Interrupted,
}

struct Collector {
    stream: AdvertisementStream,
    lease: RadioLease,
    service_filter: Uuid,
    deadline: Instant,
    cancel: CancellationToken,
    phase: watch::Sender<SessionPhase>,
}

impl Collector {
    async fn run(self) -> Result<SessionSummary> {
        let Self {
            mut stream,
            lease,
            service_filter,
            deadline,
            cancel,
            phase,
        } = self;

        let mut results = ScanResultSet::new();
        let window = sleep_until(deadline);
        tokio::pin!(window);

        let reason = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break StopReason::Cancelled,
                () = &mut window => break StopReason::WindowElapsed,
                next = stream.next() => match next {
                    Some(observation) if observation.matches_service(&service_filter) => {
                        debug!(address = %observation.address, rssi = observation.rssi, "Advertisement accepted");
                        results.push(observation);
                    }
                    Some(observation) => {
                        trace!(address = %observation.address, "Advertisement ignored");
                    }
                    None => break StopReason::Interrupted,
                },
            }
        };

        // Stop the subscription and release the radio before touching the results.
        drop(stream);
        drop(lease);
        info!(raw = results.len(), "Scan stopped");

        match reason {
            StopReason::WindowElapsed => {
                let summary = results.into_summary();
                info!(devices = summary.device_count(), "Scan completed");
                phase.send_replace(SessionPhase::Completed);
                Ok(summary)
            }
            StopReason::Cancelled => {
                info!("Scan cancelled");
                phase.send_replace(SessionPhase::Cancelled);
                Err(CheckerError::Cancelled)
            }
            StopReason::Interrupted => {
                warn!("Scan subscription ended before the window closed");
                phase.send_replace(SessionPhase::Failed);
                Err(CheckerError::ScanInterrupted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::AdvertisementObservation;
    use crate::bluetooth::{BluetoothError, MockRadio};

    fn dead_service() -> Uuid {
        Uuid::from_u128(0x0000_dead_0000_1000_8000_0080_5f9b_34fb)
    }

    fn obs(address: &str, services: Vec<Uuid>, rssi: i16) -> AdvertisementObservation {
        AdvertisementObservation::new(address, services, rssi)
    }

    fn session(radio: &MockRadio) -> ScanSession {
        ScanSession::new(RadioHandle::new(radio.clone()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_distinct_cocoa_devices() {
        let radio = MockRadio::new();
        let handle = session(&radio).start().await.unwrap();

        assert!(radio.advertise(obs("AA", vec![COCOA_SERVICE_UUID], -60)));
        assert!(radio.advertise(obs("AA", vec![COCOA_SERVICE_UUID], -55)));
        assert!(radio.advertise(obs("BB", vec![COCOA_SERVICE_UUID], -70)));
        assert!(radio.advertise(obs("CC", vec![dead_service()], -40)));

        let summary = handle.summary().await.unwrap();
        assert_eq!(summary.device_count(), 2);
        assert_eq!(summary.signal_strengths(), &[-60, -70]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_first_service_uuid_is_matched() {
        let radio = MockRadio::new();
        let handle = session(&radio).start().await.unwrap();

        radio.advertise(obs("AA", Vec::new(), -50));
        radio.advertise(obs("BB", vec![dead_service(), COCOA_SERVICE_UUID], -50));
        radio.advertise(obs("CC", vec![COCOA_SERVICE_UUID, dead_service()], -65));

        let summary = handle.summary().await.unwrap();
        assert_eq!(summary.signal_strengths(), &[-65]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_window_yields_empty_summary() {
        let radio = MockRadio::new();
        let summary = session(&radio).run().await.unwrap();

        assert_eq!(summary.device_count(), 0);
        assert!(summary.signal_strengths().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_precedes_delivery_and_respects_window() {
        let radio = MockRadio::new();
        let handle = session(&radio).start().await.unwrap();
        let started_at = handle.started_at();
        let mut phase = handle.subscribe();

        tokio::time::advance(Duration::from_secs(9)).await;
        tokio::task::yield_now().await;
        assert!(handle.is_scanning());
        assert!(radio.stopped_at().is_none());

        let summary = handle.summary().await;
        assert!(summary.is_ok());

        let stopped_at = radio.stopped_at().unwrap();
        assert!(stopped_at >= started_at + SCAN_DURATION);
        assert!(stopped_at <= Instant::now());
        assert_eq!(*phase.borrow_and_update(), SessionPhase::Completed);
        assert!(!radio.is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_advertisements_are_not_counted() {
        let radio = MockRadio::new();
        let handle = session(&radio).start().await.unwrap();

        let feeder = {
            let radio = radio.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(9)).await;
                let in_window = radio.advertise(obs("AA", vec![COCOA_SERVICE_UUID], -60));
                tokio::time::sleep(Duration::from_secs(2)).await;
                let late = radio.advertise(obs("BB", vec![COCOA_SERVICE_UUID], -70));
                (in_window, late)
            })
        };

        let summary = handle.summary().await.unwrap();
        let (in_window, late) = feeder.await.unwrap();

        assert!(in_window);
        assert!(!late);
        assert_eq!(summary.signal_strengths(), &[-60]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_suppresses_summary() {
        let radio = MockRadio::new();
        let handle = session(&radio).start().await.unwrap();
        radio.advertise(obs("AA", vec![COCOA_SERVICE_UUID], -60));

        tokio::time::advance(Duration::from_secs(3)).await;
        handle.cancel();
        let mut phase = handle.subscribe();

        let err = handle.summary().await.unwrap_err();
        assert!(matches!(err, CheckerError::Cancelled));
        assert_eq!(*phase.borrow_and_update(), SessionPhase::Cancelled);

        let stopped_at = radio.stopped_at().unwrap();
        assert!(stopped_at < radio.started_at().unwrap() + SCAN_DURATION);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_scan() {
        let radio = MockRadio::new();
        let scan = session(&radio);
        let handle = scan.start().await.unwrap();
        drop(handle);

        // The collector releases the radio once it observes the cancellation.
        for _ in 0..10 {
            if !radio.is_scanning() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!radio.is_scanning());
        assert!(scan.start().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_session_is_rejected_while_scanning() {
        let radio = MockRadio::new();
        let scan = session(&radio);
        let other = scan.clone();

        let handle = scan.start().await.unwrap();
        let err = other.start().await.err().unwrap();
        assert!(matches!(err, CheckerError::ScanAlreadyRunning));
        assert_eq!(radio.scans_started(), 1);

        handle.summary().await.unwrap();
        assert!(other.start().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_is_reported() {
        let radio = MockRadio::new();
        radio.fail_next_start(BluetoothError::DiscoveryFailed {
            message: "org.bluez.Error.NotReady".into(),
        });
        let scan = session(&radio);

        let err = scan.run().await.unwrap_err();
        assert!(matches!(err, CheckerError::ScanStartFailure(ref m) if m.contains("NotReady")));
        assert!(err.is_recoverable());

        // The radio is free again for a retry.
        assert!(scan.run().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_radio_loss_mid_window_is_an_error() {
        let radio = MockRadio::new();
        let handle = session(&radio).start().await.unwrap();
        radio.advertise(obs("AA", vec![COCOA_SERVICE_UUID], -60));

        tokio::time::advance(Duration::from_secs(4)).await;
        radio.cut_off();

        let err = handle.summary().await.unwrap_err();
        assert!(matches!(err, CheckerError::ScanInterrupted));
    }

    #[tokio::test]
    async fn test_zero_window_is_rejected() {
        let radio = MockRadio::new();
        let scan = ScanSession::with_window(
            RadioHandle::new(radio.clone()),
            Duration::ZERO,
            COCOA_SERVICE_UUID,
        );

        assert!(matches!(
            scan.start().await.err().unwrap(),
            CheckerError::InvalidScanWindow
        ));
        assert_eq!(radio.scans_started(), 0);
    }
}
