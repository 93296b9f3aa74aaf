//! The screen's control flow: gate first, then one scan per start action.

use std::io::Write;
use std::time::Duration;

use cocoa_core::{resolve_preconditions, CheckerError, HostEnvironment, ScanSession};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::screen::{render_summary, SCANNING, START_PROMPT};

/// Interval between busy-indicator dots.
const BUSY_TICK: Duration = Duration::from_secs(1);

/// How a run of the screen ended.
#[derive(Debug)]
pub enum Outcome {
    /// The user quit (end of input or shutdown signal).
    Finished,
    /// A precondition failed; nothing was scanned.
    Blocked(CheckerError),
}

/// Single-screen application state.
pub struct App {
    session: ScanSession,
    shutdown: CancellationToken,
}

impl App {
    /// Create the screen around a scan session.
    ///
    /// Cancelling `shutdown` stops a running scan and ends [`App::run`].
    pub fn new(session: ScanSession, shutdown: CancellationToken) -> Self {
        Self { session, shutdown }
    }

    /// Run the gate, then scan once per line read from `input`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::IoError`] only if reading input or writing
    /// output fails.
    pub async fn run<H, R, W>(&self, host: &H, input: R, out: &mut W) -> cocoa_core::Result<Outcome>
    where
        H: HostEnvironment + ?Sized,
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        if let Err(err) = resolve_preconditions(host).await {
            warn!(code = err.error_code(), "Cannot scan: {err}");
            writeln!(out, "{}", err.user_message())?;
            return Ok(Outcome::Blocked(err));
        }

        let mut lines = input.lines();
        loop {
            writeln!(out, "{START_PROMPT}")?;
            out.flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                () = self.shutdown.cancelled() => None,
            };
            if line.is_none() {
                info!("Leaving");
                return Ok(Outcome::Finished);
            }

            self.scan_once(out).await?;
            if self.shutdown.is_cancelled() {
                return Ok(Outcome::Finished);
            }
        }
    }

    /// Run one session, showing a busy indicator until it ends.
    async fn scan_once<W: Write>(&self, out: &mut W) -> cocoa_core::Result<()> {
        let handle = match self.session.start().await {
            Ok(handle) => handle,
            Err(err) => {
                writeln!(out, "{}", err.user_message())?;
                return Ok(());
            }
        };

        let cancel = handle.cancel_token();
        write!(out, "{SCANNING}")?;
        out.flush()?;

        let summary = handle.summary();
        tokio::pin!(summary);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + BUSY_TICK, BUSY_TICK);

        let result = loop {
            tokio::select! {
                result = &mut summary => break result,
                () = self.shutdown.cancelled(), if !cancel.is_cancelled() => cancel.cancel(),
                _ = ticker.tick() => {
                    write!(out, ".")?;
                    out.flush()?;
                }
            }
        };
        writeln!(out)?;

        match result {
            Ok(summary) => writeln!(out, "{}", render_summary(&summary))?,
            Err(err) => {
                info!(code = err.error_code(), "Scan ended without a summary");
                writeln!(out, "{}", err.user_message())?;
            }
        }
        Ok(())
    }
}
