//! In-memory radio and host used for development and tests.
//!
//! [`MockRadio`] hands out a channel-backed scan stream; advertisements are
//! injected with [`MockRadio::advertise`]. [`MockHost`] answers the gate's
//! questions from plain flags.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{Stream, StreamExt};
use tokio::time::Instant;

use super::{AdvertisementStream, BluetoothError, BluetoothResult, Radio};
use crate::advertisement::AdvertisementObservation;
use crate::gate::HostEnvironment;

/// Channel-fed radio. Clones share state.
#[derive(Clone, Default)]
pub struct MockRadio {
    inner: Arc<MockRadioInner>,
}

#[derive(Default)]
struct MockRadioInner {
    sender: Mutex<Option<UnboundedSender<AdvertisementObservation>>>,
    start_error: Mutex<Option<BluetoothError>>,
    scans_started: AtomicUsize,
    started_at: Mutex<Option<Instant>>,
    stopped_at: Arc<Mutex<Option<Instant>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockRadio {
    /// Create an idle radio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `start_scan` fail with `error`.
    pub fn fail_next_start(&self, error: BluetoothError) {
        *lock(&self.inner.start_error) = Some(error);
    }

    /// Deliver an advertisement to the active scan.
    ///
    /// Returns `false` if no scan is running to receive it.
    pub fn advertise(&self, observation: AdvertisementObservation) -> bool {
        lock(&self.inner.sender)
            .as_ref()
            .is_some_and(|tx| tx.unbounded_send(observation).is_ok())
    }

    /// Terminate the active subscription from the radio side, as if the
    /// adapter had been switched off.
    pub fn cut_off(&self) {
        lock(&self.inner.sender).take();
    }

    /// Returns `true` while a scan stream is alive.
    pub fn is_scanning(&self) -> bool {
        lock(&self.inner.sender)
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Number of successful `start_scan` calls.
    pub fn scans_started(&self) -> usize {
        self.inner.scans_started.load(Ordering::SeqCst)
    }

    /// When the most recent scan started.
    pub fn started_at(&self) -> Option<Instant> {
        *lock(&self.inner.started_at)
    }

    /// When the most recent scan stream was dropped.
    pub fn stopped_at(&self) -> Option<Instant> {
        *lock(&self.inner.stopped_at)
    }
}

#[async_trait]
impl Radio for MockRadio {
    async fn start_scan(&self) -> BluetoothResult<AdvertisementStream> {
        if let Some(err) = lock(&self.inner.start_error).take() {
            return Err(err);
        }

        let (tx, rx) = mpsc::unbounded();
        *lock(&self.inner.sender) = Some(tx);
        *lock(&self.inner.started_at) = Some(Instant::now());
        *lock(&self.inner.stopped_at) = None;
        self.inner.scans_started.fetch_add(1, Ordering::SeqCst);

        Ok(MockScanStream {
            rx,
            stopped_at: Arc::clone(&self.inner.stopped_at),
        }
        .boxed())
    }
}

struct MockScanStream {
    rx: UnboundedReceiver<AdvertisementObservation>,
    stopped_at: Arc<Mutex<Option<Instant>>>,
}

impl Stream for MockScanStream {
    type Item = AdvertisementObservation;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_next_unpin(cx)
    }
}

impl Drop for MockScanStream {
    fn drop(&mut self) {
        *lock(&self.stopped_at) = Some(Instant::now());
    }
}

/// Host whose capabilities are set up front.
#[derive(Debug)]
pub struct MockHost {
    ble_supported: bool,
    bluetooth_enabled: bool,
    permission_granted: AtomicBool,
    grant_on_request: bool,
    permission_requests: AtomicUsize,
}

impl MockHost {
    /// A host where every precondition holds.
    pub fn ready() -> Self {
        Self {
            ble_supported: true,
            bluetooth_enabled: true,
            permission_granted: AtomicBool::new(true),
            grant_on_request: true,
            permission_requests: AtomicUsize::new(0),
        }
    }

    /// A host without BLE hardware.
    #[must_use]
    pub fn without_ble(mut self) -> Self {
        self.ble_supported = false;
        self
    }

    /// A host whose radio is switched off.
    #[must_use]
    pub fn with_bluetooth_disabled(mut self) -> Self {
        self.bluetooth_enabled = false;
        self
    }

    /// A host where the permission is missing; `grant_on_request` decides
    /// how the user answers the request.
    #[must_use]
    pub fn without_permission(mut self, grant_on_request: bool) -> Self {
        self.permission_granted = AtomicBool::new(false);
        self.grant_on_request = grant_on_request;
        self
    }

    /// Number of permission requests made so far.
    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostEnvironment for MockHost {
    async fn supports_ble(&self) -> bool {
        self.ble_supported
    }

    async fn is_bluetooth_enabled(&self) -> bool {
        self.bluetooth_enabled
    }

    async fn has_scan_permission(&self) -> bool {
        self.permission_granted.load(Ordering::SeqCst)
    }

    async fn request_scan_permission(&self) -> bool {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        if self.grant_on_request {
            self.permission_granted.store(true, Ordering::SeqCst);
        }
        self.grant_on_request
    }
}
