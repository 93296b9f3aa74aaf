//! # cocoa-checker
//!
//! Counts the devices nearby that advertise the COCOA exposure-notification
//! service, over a 10 second BLE scan.
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package cocoa-checker
//!
//! # Verbose
//! COCOA_LOG_LEVEL=debug ./cocoa-checker
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::process::ExitCode;

use cocoa_checker::app::{App, Outcome};
use cocoa_checker::{logging, platform};
use cocoa_core::{AppConfig, CheckerError, ScanSession};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn main() -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run());
    // The stdin reader may still be parked on a blocking read.
    runtime.shutdown_background();

    match result {
        Ok(Outcome::Finished) => ExitCode::SUCCESS,
        Ok(Outcome::Blocked(_)) => ExitCode::FAILURE,
        Err(e) => {
            match e.downcast_ref::<CheckerError>() {
                Some(err) => error!(code = err.error_code(), "{err}"),
                None => error!("{e:#}"),
            }
            eprintln!("cocoa-checker: {e:#}");
            if e.downcast_ref::<CheckerError>().is_some_and(CheckerError::is_config_error) {
                eprintln!(
                    "Set {} to choose another configuration file",
                    cocoa_core::config::CONFIG_PATH_ENV
                );
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<Outcome> {
    let config = AppConfig::load().map_err(CheckerError::from)?;
    logging::init(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting cocoa-checker");

    let (host, radio) = platform::connect(&config.bluetooth).await;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted");
                shutdown.cancel();
            }
        });
    }

    let app = App::new(ScanSession::new(radio), shutdown);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    Ok(app.run(host.as_ref(), stdin, &mut stdout).await?)
}
