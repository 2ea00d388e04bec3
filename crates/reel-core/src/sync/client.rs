use crate::{
    BackendGateway, CoreResult, PastRecordings, SharedGateway, SyncError,
    gateway::{BackendCommand, call},
    sync::{
        SyncedState,
        decode::{decode_recording_status, decode_saving_status},
        poller::{CancelHandle, PollingLoop, SyncCommand, SyncRequest},
    },
};

use std::{
    panic::Location,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, trace};

/// Default delay between status checks while recording or saving.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Pending commands a running loop will queue before callers wait.
const REQUEST_QUEUE: usize = 8;

/// Tuning for [`StatusSyncClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Delay between status checks while recording or saving.
    pub poll_interval: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Keeps a [`SyncedState`] in step with the backend.
///
/// Cloning is cheap: clones share the gateway, the recordings projection and
/// the running polling loop.
#[derive(Clone)]
pub struct StatusSyncClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    gateway: SharedGateway,
    options: SyncOptions,
    recordings: PastRecordings,
    link: Mutex<Option<LoopLink>>,
    snapshot: Mutex<Option<SyncedState>>,
}

/// Connection from the client to its running polling loop.
struct LoopLink {
    handle: CancelHandle,
    requests: mpsc::Sender<SyncRequest>,
}

impl StatusSyncClient {
    /// Create a client over `gateway`.
    pub fn new(gateway: SharedGateway, options: SyncOptions) -> Self {
        let recordings = PastRecordings::new(Arc::clone(&gateway));

        Self {
            inner: Arc::new(ClientInner {
                gateway,
                options,
                recordings,
                link: Mutex::new(None),
                snapshot: Mutex::new(None),
            }),
        }
    }

    /// Options this client was built with.
    pub fn options(&self) -> SyncOptions {
        self.inner.options
    }

    /// Recordings projection refreshed when a save completes.
    pub fn recordings(&self) -> &PastRecordings {
        &self.inner.recordings
    }

    /// Last state this client published, `None` until the first sync.
    pub fn current(&self) -> Option<SyncedState> {
        lock(&self.inner.snapshot).clone()
    }

    /// Ask the backend for its recording status.
    ///
    /// # Errors
    ///
    /// `Transport` if the call fails, `Protocol` if the reply shape is unknown.
    #[instrument(level = "debug", skip(self))]
    pub async fn refresh(&self) -> CoreResult<SyncedState> {
        let reply = call(self.gateway(), &BackendCommand::RecordingState).await?;
        let status = decode_recording_status(&reply)?;
        trace!(?status, "Recording status received");
        Ok(status.into())
    }

    /// Ask the backend for its saving status; `None` when no save is active.
    ///
    /// # Errors
    ///
    /// `Transport` if the call fails, `Protocol` if the reply shape is unknown.
    #[instrument(level = "debug", skip(self))]
    pub async fn refresh_saving(&self) -> CoreResult<Option<SyncedState>> {
        let reply = call(self.gateway(), &BackendCommand::SavingProgress).await?;
        let status = decode_saving_status(&reply)?;
        trace!(?status, "Saving status received");
        Ok(status.map(SyncedState::from))
    }

    /// Resolve an unknown state: a save still being written wins, otherwise
    /// the recording status.
    ///
    /// The backend keeps reporting `Done` after a save finishes, so a finished
    /// save never decides an unknown state.
    pub(crate) async fn resync(&self) -> CoreResult<SyncedState> {
        match self.refresh_saving().await? {
            Some(saving) if saving.is_active_save() => Ok(saving),
            _ => self.refresh().await,
        }
    }

    /// Start capturing, then resync.
    ///
    /// # Errors
    ///
    /// Fails if the backend rejects the command or the resync fails.
    #[instrument(skip(self))]
    pub async fn start(&self) -> CoreResult<SyncedState> {
        self.dispatch(SyncCommand::Start).await
    }

    /// Stop capturing, then resync.
    ///
    /// # Errors
    ///
    /// Fails if the backend rejects the command or the resync fails.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> CoreResult<SyncedState> {
        self.dispatch(SyncCommand::Stop).await
    }

    /// Show `Discarding` at once, discard the recording, then resync from scratch.
    ///
    /// # Errors
    ///
    /// Fails if the backend rejects the command or the resync fails.
    #[instrument(skip(self))]
    pub async fn discard_optimistic(&self) -> CoreResult<SyncedState> {
        self.dispatch(SyncCommand::Discard).await
    }

    /// Save the recording, then report the saving status.
    ///
    /// # Errors
    ///
    /// Fails if the backend rejects the command or the resync fails.
    #[instrument(skip(self))]
    pub async fn release(&self) -> CoreResult<SyncedState> {
        self.dispatch(SyncCommand::Release).await
    }

    /// Start the polling loop, replacing any loop this client already runs.
    ///
    /// Every published state reaches `on_update`; every failure reaches
    /// `on_fatal_error`. While the loop runs, commands on this client are
    /// executed by the loop so they never overlap a status query.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_polling_loop<U, E>(&self, on_update: U, on_fatal_error: E) -> CancelHandle
    where
        U: Fn(SyncedState) + Send + 'static,
        E: Fn(SyncError) + Send + 'static,
    {
        let (requests, request_rx) = mpsc::channel(REQUEST_QUEUE);
        let handle = CancelHandle::new();

        let previous = lock(&self.inner.link).replace(LoopLink {
            handle: handle.clone(),
            requests,
        });
        if let Some(previous) = previous {
            previous.handle.cancel();
            debug!(loop_id = %previous.handle.loop_id(), "Replaced previous polling loop");
        }

        let polling = PollingLoop::new(
            Arc::downgrade(&self.inner),
            self.inner.options.poll_interval,
            handle.loop_id(),
            request_rx,
            handle.subscribe(),
            on_update,
            on_fatal_error,
        );
        tokio::spawn(polling.run());

        info!(
            loop_id = %handle.loop_id(),
            interval_ms = self.inner.options.poll_interval.as_millis(),
            "Polling loop started"
        );

        handle
    }

    /// Run the backend side of a command and resync.
    pub(crate) async fn perform(&self, command: SyncCommand) -> CoreResult<SyncedState> {
        match command {
            SyncCommand::Start => {
                call(self.gateway(), &BackendCommand::StartRecording).await?;
                self.refresh().await
            }
            SyncCommand::Stop => {
                call(self.gateway(), &BackendCommand::StopRecording).await?;
                self.refresh().await
            }
            SyncCommand::Discard => {
                call(self.gateway(), &BackendCommand::DiscardRecording).await?;
                self.resync().await
            }
            SyncCommand::Release => {
                call(self.gateway(), &BackendCommand::SaveRecording).await?;
                match self.refresh_saving().await? {
                    Some(saving) => Ok(saving),
                    None => self.refresh().await,
                }
            }
        }
    }

    /// Client for a loop's weak link, `None` once every client is dropped.
    pub(crate) fn upgrade(inner: &Weak<ClientInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn store_snapshot(&self, state: SyncedState) {
        *lock(&self.inner.snapshot) = Some(state);
    }

    async fn dispatch(&self, command: SyncCommand) -> CoreResult<SyncedState> {
        let location = ErrorLocation::from(Location::caller());

        let requests = lock(&self.inner.link)
            .as_ref()
            .filter(|link| !link.handle.is_cancelled())
            .map(|link| link.requests.clone());

        let Some(requests) = requests else {
            if command == SyncCommand::Discard {
                self.store_snapshot(SyncedState::Discarding);
            }
            let state = self.perform(command).await?;
            self.store_snapshot(state.clone());
            return Ok(state);
        };

        let (reply, reply_rx) = oneshot::channel();
        if requests.send(SyncRequest { command, reply }).await.is_err() {
            return Err(SyncError::LoopClosed { location });
        }

        reply_rx
            .await
            .map_err(|_| SyncError::LoopClosed { location })?
    }

    fn gateway(&self) -> &dyn BackendGateway {
        self.inner.gateway.as_ref()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
