//! Scheduling core of the status synchronization client.
//!
//! One task owns the synced state. It wakes either for a queued command or
//! for a tick, and each state has exactly one scheduling rule:
//!
//! | state       | next wake                                              |
//! |-------------|--------------------------------------------------------|
//! | unknown     | immediately (after one interval when the last try failed) |
//! | `Recording` | after one interval, re-read recording status           |
//! | `Saving`    | after one interval, re-read saving status, or finish   |
//! | other       | never; only a command moves the state                  |

use crate::{
    CoreResult, SyncError, StatusSyncClient,
    sync::{SavingPhase, SyncedState, client::ClientInner},
};

use std::{
    future::Future,
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};
use uuid::Uuid;

/// User-driven transitions routed through the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyncCommand {
    Start,
    Stop,
    Discard,
    Release,
}

/// A command waiting for the loop, with the channel for its outcome.
pub(crate) struct SyncRequest {
    pub(crate) command: SyncCommand,
    pub(crate) reply: oneshot::Sender<CoreResult<SyncedState>>,
}

/// Stops a polling loop.
///
/// Cancelling discards results of requests still in flight. A callback the
/// loop was already delivering when `cancel` ran may still complete, but no
/// further callback starts. Cancelling twice is a no-op.
///
/// The loop also stops once every clone of its client has been dropped.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<watch::Sender<bool>>,
    loop_id: Uuid,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        let (cancelled, _) = watch::channel(false);
        Self {
            cancelled: Arc::new(cancelled),
            loop_id: Uuid::new_v4(),
        }
    }

    /// Stop the loop. Idempotent.
    pub fn cancel(&self) {
        let first = self.cancelled.send_if_modified(|cancelled| {
            let changed = !*cancelled;
            *cancelled = true;
            changed
        });

        if first {
            debug!(loop_id = %self.loop_id, "Polling loop cancelled");
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Identifier attached to the loop's log records.
    pub fn loop_id(&self) -> Uuid {
        self.loop_id
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.cancelled.subscribe()
    }
}

/// The task behind [`StatusSyncClient::start_polling_loop`].
pub(crate) struct PollingLoop<U, E> {
    /// Weak so the loop never keeps its own command channel open.
    client: Weak<ClientInner>,
    interval: Duration,
    loop_id: Uuid,
    requests: mpsc::Receiver<SyncRequest>,
    cancelled: watch::Receiver<bool>,
    on_update: U,
    on_fatal_error: E,
    /// `None` while the state is unknown.
    state: Option<SyncedState>,
    /// Last attempt to resolve an unknown state failed in transport.
    retry_pending: bool,
    /// A reply could not be interpreted; no ticks until the next command.
    halted: bool,
}

impl<U, E> PollingLoop<U, E>
where
    U: Fn(SyncedState) + Send + 'static,
    E: Fn(SyncError) + Send + 'static,
{
    pub(crate) fn new(
        client: Weak<ClientInner>,
        interval: Duration,
        loop_id: Uuid,
        requests: mpsc::Receiver<SyncRequest>,
        cancelled: watch::Receiver<bool>,
        on_update: U,
        on_fatal_error: E,
    ) -> Self {
        Self {
            client,
            interval,
            loop_id,
            requests,
            cancelled,
            on_update,
            on_fatal_error,
            state: None,
            retry_pending: false,
            halted: false,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let wake = self.next_wake();

            let keep_running = tokio::select! {
                biased;
                _ = wait_cancelled(&mut self.cancelled) => false,
                request = self.requests.recv() => match request {
                    Some(request) => self.handle_request(request).await,
                    None => false,
                },
                () = sleep_until_wake(wake) => self.tick().await,
            };

            if !keep_running {
                break;
            }
        }

        debug!(loop_id = %self.loop_id, "Polling loop stopped");
    }

    fn next_wake(&self) -> Option<Duration> {
        if self.halted {
            return None;
        }

        let interval = self.interval;

        match &self.state {
            None if self.retry_pending => Some(interval),
            None => Some(Duration::ZERO),
            Some(SyncedState::Recording { .. } | SyncedState::Saving { .. }) => Some(interval),
            Some(SyncedState::Idle | SyncedState::Done { .. } | SyncedState::Discarding) => None,
        }
    }

    /// Execute one queued command. Returns `false` once cancelled or orphaned.
    async fn handle_request(&mut self, request: SyncRequest) -> bool {
        let SyncRequest { command, reply } = request;
        let Some(client) = StatusSyncClient::upgrade(&self.client) else {
            return false;
        };
        debug!(loop_id = %self.loop_id, ?command, "Executing command");

        self.halted = false;

        if command == SyncCommand::Discard {
            self.publish(&client, SyncedState::Discarding);
        }

        // Dropping `reply` on cancellation tells the caller the loop closed.
        let Some(result) = guarded(&mut self.cancelled, client.perform(command)).await else {
            return false;
        };

        match &result {
            Ok(state) => {
                self.retry_pending = false;
                self.publish(&client, state.clone());
            }
            Err(error) => {
                warn!(loop_id = %self.loop_id, ?command, error = %error, "Command failed");
                if error.is_protocol() {
                    self.halted = true;
                }
                if self.state == Some(SyncedState::Discarding) {
                    self.state = None;
                    self.retry_pending = true;
                }
            }
        }

        let _ = reply.send(result);
        true
    }

    /// Apply the scheduling rule of the current state. Returns `false` once
    /// cancelled or orphaned.
    async fn tick(&mut self) -> bool {
        let Some(client) = StatusSyncClient::upgrade(&self.client) else {
            return false;
        };

        let outcome = match self.state.clone() {
            None => guarded(&mut self.cancelled, client.resync())
                .await
                .map(|result| result.map(Some)),
            Some(SyncedState::Recording { .. }) => {
                guarded(&mut self.cancelled, client.refresh())
                    .await
                    .map(|result| result.map(Some))
            }
            Some(SyncedState::Saving {
                phase: SavingPhase::Done,
                ..
            }) => {
                let Some(refreshed) =
                    guarded(&mut self.cancelled, client.recordings().refresh()).await
                else {
                    return false;
                };
                if let Err(error) = refreshed {
                    self.report(error);
                }
                Some(Ok(Some(SyncedState::Idle)))
            }
            Some(SyncedState::Saving { .. }) => {
                guarded(&mut self.cancelled, client.refresh_saving()).await
            }
            Some(SyncedState::Idle | SyncedState::Done { .. } | SyncedState::Discarding) => {
                return true;
            }
        };

        let Some(result) = outcome else {
            return false;
        };

        match result {
            Ok(Some(state)) => {
                self.retry_pending = false;
                self.publish(&client, state);
            }
            Ok(None) => {
                // Save ended without reporting Done; resolve from scratch.
                self.state = None;
                self.retry_pending = false;
            }
            Err(error) if error.is_protocol() => {
                self.halted = true;
                self.report(error);
            }
            Err(error) => {
                if self.state.is_none() {
                    self.retry_pending = true;
                }
                self.report(error);
            }
        }

        true
    }

    fn publish(&mut self, client: &StatusSyncClient, state: SyncedState) {
        if *self.cancelled.borrow() {
            return;
        }

        self.state = Some(state.clone());
        client.store_snapshot(state.clone());
        (self.on_update)(state);
    }

    fn report(&self, error: SyncError) {
        if *self.cancelled.borrow() {
            return;
        }

        warn!(loop_id = %self.loop_id, error = %error, "Status poll failed");
        (self.on_fatal_error)(error);
    }
}

/// Resolve once the loop is cancelled or its handle is gone.
async fn wait_cancelled(cancelled: &mut watch::Receiver<bool>) {
    let _ = cancelled.wait_for(|cancelled| *cancelled).await;
}

async fn sleep_until_wake(wake: Option<Duration>) {
    match wake {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}

/// Run `work` unless the loop is cancelled first; `None` means cancelled.
async fn guarded<T>(cancelled: &mut watch::Receiver<bool>, work: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        _ = wait_cancelled(cancelled) => None,
        output = work => Some(output),
    }
}
