use crate::{AppCommand, AppResult, RecordingSession, StatusView, status_view::recording_index};

use std::io::Write;

use chrono::Utc;
use reel_core::{RecorderOptions, StatusSyncClient, SyncError, SyncedState};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument, warn};

/// Output of the polling loop, forwarded to the application task.
#[derive(Debug)]
enum LoopEvent {
    Update(SyncedState),
    Failed(SyncError),
}

/// Main application state.
///
/// Owns the status display. Published states arrive from the polling loop
/// over a channel, so rendering happens on this task only.
pub struct App<W> {
    pub(crate) client: StatusSyncClient,
    pub(crate) options: RecorderOptions,
    pub(crate) view: StatusView<W>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) session: RecordingSession,
}

impl<W: Write> App<W> {
    /// Run the main application event loop until `quit` or end of input.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Reel starting");

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let failure_tx = event_tx.clone();
        let handle = self.client.start_polling_loop(
            move |state| {
                let _ = event_tx.send(LoopEvent::Update(state));
            },
            move |error| {
                let _ = failure_tx.send(LoopEvent::Failed(error));
            },
        );

        if let Err(e) = self.options.load().await {
            warn!(error = %e, "Failed to load recorder options");
        }
        if let Err(e) = self.client.recordings().refresh().await {
            warn!(error = %e, "Failed to load recordings");
        }

        loop {
            tokio::select! {
                biased;

                Some(event) = event_rx.recv() => {
                    if let Err(e) = self.handle_event(event) {
                        error!(error = ?e, "Failed to render status");
                    }
                }

                command = self.command_rx.recv() => match command {
                    Some(AppCommand::Quit) => {
                        info!("Shutdown requested");
                        break;
                    }
                    Some(command) => {
                        if let Err(e) = self.handle_command(command).await {
                            error!(error = ?e, "Failed to handle command");
                        }
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                },
            }
        }

        handle.cancel();
        let _ = self.shutdown_tx.send(true);
        info!(loop_id = %handle.loop_id(), "Reel shut down successfully");

        Ok(())
    }

    fn handle_event(&mut self, event: LoopEvent) -> AppResult<()> {
        match event {
            LoopEvent::Update(state) => {
                self.session.observe(&state);
                self.view.render_state(&state, Utc::now())
            }
            LoopEvent::Failed(error) => self.view.notice(&format!("Backend error: {error}")),
        }
    }

    #[instrument(skip(self), fields(session_id = ?self.session.session_id()))]
    async fn handle_command(&mut self, command: AppCommand) -> AppResult<()> {
        let outcome = match command {
            AppCommand::Start => self.client.start().await.map(|_| ()),
            AppCommand::Stop => self.client.stop().await.map(|_| ()),
            AppCommand::Discard => self.client.discard_optimistic().await.map(|_| ()),
            AppCommand::Save => self.client.release().await.map(|_| ()),
            AppCommand::List => {
                let entries = self.client.recordings().entries();
                return self.view.render_recordings(&entries, Utc::now());
            }
            AppCommand::Remove { number } => match self.recording_at(number)? {
                Some(index) => self.client.recordings().remove(index).await.map(|_| ()),
                None => return Ok(()),
            },
            AppCommand::Open { number } => match self.recording_at(number)? {
                Some(index) => self.client.recordings().open_location(index).await,
                None => return Ok(()),
            },
            AppCommand::Options => {
                return self.view.render_options(
                    &self.options.settings(),
                    &self.options.available_resolutions(),
                    &self.options.available_frame_rates(),
                );
            }
            AppCommand::FrameRate { fps } => {
                if !self.settings_editable()? {
                    return Ok(());
                }
                self.options.set_frame_rate(fps).await
            }
            AppCommand::Resolution { number } => {
                if !self.settings_editable()? {
                    return Ok(());
                }
                self.options.set_resolution(number - 1).await.map(|_| ())
            }
            AppCommand::Pointer { style } => {
                if !self.settings_editable()? {
                    return Ok(());
                }
                self.options.set_pointer(style).await
            }
            AppCommand::Invalid { input, reason } => {
                return self.view.notice(&format!("Ignored `{input}`: {reason}"));
            }
            AppCommand::Quit => return Ok(()),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(e @ SyncError::LoopClosed { .. }) => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Command failed");
                self.view.notice(&format!("Command failed: {e}"))
            }
        }
    }

    /// Backend index for a listed recording, reporting unknown numbers.
    fn recording_at(&mut self, number: usize) -> AppResult<Option<usize>> {
        let index = recording_index(number, self.client.recordings().count());
        if index.is_none() {
            self.view
                .notice(&format!("No recording #{number}. Type `list` to see them."))?;
        }
        Ok(index)
    }

    /// Settings follow the backend only while it is idle.
    fn settings_editable(&mut self) -> AppResult<bool> {
        let editable = self
            .client
            .current()
            .is_none_or(|state| state.accepts_settings_change());
        if !editable {
            self.view.notice("Settings can only be changed while idle.")?;
        }
        Ok(editable)
    }
}
