//! Reel: terminal front end for the screen recorder status client.

mod app;
mod app_command;
mod command_reader;
mod config;
mod error;
mod logging;
mod recording_session;
mod status_view;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    command_reader::CommandReader,
    error::{AppError, Result as AppResult},
    recording_session::RecordingSession,
    status_view::StatusView,
};

use crate::config::{Config, LoggingConfig};

use std::{io, sync::Arc, time::Duration};

use reel_core::{MockBackend, RecorderOptions, SharedGateway, StatusSyncClient};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

/// Application entry point.
fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            let _ = logging::setup(&LoggingConfig::default());
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::setup(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(run(config));

    // The stdin reader may still be parked in a blocking read.
    runtime.shutdown_timeout(Duration::from_millis(100));
}

async fn run(config: Config) {
    info!(
        poll_interval_ms = config.sync.poll_interval_ms,
        latency_ms = config.backend.latency_ms,
        "Using development backend"
    );

    let gateway: SharedGateway = Arc::new(MockBackend::new(config.backend.timing()));
    let client = StatusSyncClient::new(Arc::clone(&gateway), config.sync.sync_options());
    let options = RecorderOptions::new(gateway);

    let (command_tx, command_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader = CommandReader::new(command_tx);
    let app = App {
        client,
        options,
        view: StatusView::new(io::stdout()),
        command_rx,
        shutdown_tx,
        session: RecordingSession::default(),
    };

    tokio::join!(
        async {
            if let Err(e) = reader.run(io::BufReader::new(io::stdin()), shutdown_rx).await {
                error!(error = ?e, "Command reader error");
            }
        },
        async {
            if let Err(e) = app.run().await {
                error!(error = ?e, "App error");
            }
        }
    );
}
