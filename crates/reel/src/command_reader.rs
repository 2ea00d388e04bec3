//! Line-oriented command input.
//!
//! Reads lines on a blocking thread and forwards parsed commands to the
//! application over an async channel. End of input closes the channel.

use crate::{AppCommand, AppError, AppResult};

use std::{io::BufRead, panic::Location, time::Duration};

use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Reads commands from a line source.
pub struct CommandReader {
    command_tx: mpsc::Sender<AppCommand>,
}

impl CommandReader {
    /// Create a reader that forwards to `command_tx`.
    pub fn new(command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self { command_tx }
    }

    /// Forward commands from `input` until it ends or shutdown is signalled.
    ///
    /// Blank lines are skipped. Dropping the reader on return closes the
    /// command channel.
    #[instrument(skip_all)]
    pub async fn run<R>(self, input: R, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()>
    where
        R: BufRead + Send + 'static,
    {
        let (line_tx, mut line_rx) = mpsc::channel(32);

        // Shutdown: when line_rx is dropped, the next blocking_send() fails
        // and the blocking loop ends.
        let handle = tokio::task::spawn_blocking(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if line_tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read input");
                        break;
                    }
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    debug!("Command reader shutting down");
                    break;
                }
                line = line_rx.recv() => match line {
                    Some(line) => self.forward(&line).await?,
                    None => {
                        info!("Input closed");
                        break;
                    }
                },
            }
        }

        drop(line_rx);

        // Best-effort join: the blocking task may be stuck in a read.
        match tokio::time::timeout(Duration::from_secs(1), handle).await {
            Ok(Ok(())) => debug!("Input forwarder stopped cleanly"),
            Ok(Err(e)) => warn!(error = ?e, "Input forwarder task panicked"),
            Err(_) => debug!("Input forwarder still blocked on read, will be cleaned up on exit"),
        }

        Ok(())
    }

    async fn forward(&self, line: &str) -> AppResult<()> {
        let Some(command) = AppCommand::parse(line) else {
            return Ok(());
        };

        debug!(?command, "Command read");

        self.command_tx
            .send(command)
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to send command: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
