use crate::{
    CancelHandle, SavingPhase, StatusSyncClient, SyncError, SyncOptions, SyncedState,
    tests::support::ScriptedGateway,
};

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use serde_json::{Value, json};
use tokio::sync::mpsc::{self, UnboundedReceiver};

const STARTED: i64 = 1_704_067_200_000;

struct Observed {
    updates: UnboundedReceiver<SyncedState>,
    errors: UnboundedReceiver<SyncError>,
}

impl Observed {
    #[allow(clippy::unwrap_used)]
    async fn next_update(&mut self) -> SyncedState {
        tokio::time::timeout(Duration::from_secs(30), self.updates.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[allow(clippy::unwrap_used)]
    async fn next_error(&mut self) -> SyncError {
        tokio::time::timeout(Duration::from_secs(30), self.errors.recv())
            .await
            .unwrap()
            .unwrap()
    }

    fn drain_updates(&mut self) -> Vec<SyncedState> {
        std::iter::from_fn(|| self.updates.try_recv().ok()).collect()
    }

    fn drain_errors(&mut self) -> Vec<SyncError> {
        std::iter::from_fn(|| self.errors.try_recv().ok()).collect()
    }
}

fn start_observed(client: &StatusSyncClient) -> (crate::CancelHandle, Observed) {
    let (update_tx, updates) = mpsc::unbounded_channel();
    let (error_tx, errors) = mpsc::unbounded_channel();

    let handle = client.start_polling_loop(
        move |state| {
            let _ = update_tx.send(state);
        },
        move |error| {
            let _ = error_tx.send(error);
        },
    );

    (handle, Observed { updates, errors })
}

fn client_over(gateway: &Arc<ScriptedGateway>) -> StatusSyncClient {
    StatusSyncClient::new(gateway.clone(), SyncOptions::default())
}

/// WHAT: A new loop with no active save adopts the recording status, then sleeps
/// WHY: Idle changes only through user commands
#[tokio::test(start_paused = true)]
async fn given_idle_backend_when_loop_starts_then_single_idle_update() {
    // Given: Backend idle with no save
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .always("saving_progress", Value::Null)
        .always("recording_state", json!("Idle"));
    let client = client_over(&gateway);

    // When: Starting the loop and letting time pass
    let (handle, mut observed) = start_observed(&client);
    let first = observed.next_update().await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Then: One Idle update and no further polling
    assert_eq!(first, SyncedState::Idle);
    assert!(observed.drain_updates().is_empty());
    assert_eq!(gateway.calls("saving_progress"), 1);
    assert_eq!(gateway.calls("recording_state"), 1);
    handle.cancel();
}

/// WHAT: A new loop adopts an active save without asking for the recording status
/// WHY: A save in progress outranks the recording status
#[tokio::test(start_paused = true)]
async fn given_active_save_when_loop_starts_then_saving_adopted() {
    // Given: Backend mid-save
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.always("saving_progress", json!({ "Saving": [1, 4] }));
    let client = client_over(&gateway);

    // When: Starting the loop
    let (handle, mut observed) = start_observed(&client);
    let first = observed.next_update().await;

    // Then: Saving at a quarter, recording status untouched
    assert_eq!(first, SyncedState::saving_progress(1, 4));
    assert_eq!(gateway.calls("recording_state"), 0);
    handle.cancel();
}

/// WHAT: Recording is re-read every tick until the backend reports Done
/// WHY: The backend may stop on its own, e.g. at a size limit
#[tokio::test(start_paused = true)]
async fn given_recording_when_backend_stops_then_done_adopted_and_polling_ends() {
    // Given: Backend recording for two ticks, then done
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .always("saving_progress", Value::Null)
        .reply("recording_state", json!({ "Recording": STARTED }))
        .reply("recording_state", json!({ "Recording": STARTED }))
        .always("recording_state", json!({ "Done": 7 }));
    let client = client_over(&gateway);

    // When: Running the loop
    let (handle, mut observed) = start_observed(&client);
    let updates = [
        observed.next_update().await,
        observed.next_update().await,
        observed.next_update().await,
    ];
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Then: Recording, Recording, Done and then silence
    assert!(matches!(updates[0], SyncedState::Recording { .. }));
    assert!(matches!(updates[1], SyncedState::Recording { .. }));
    assert_eq!(
        updates[2],
        SyncedState::Done {
            duration_seconds: 7
        }
    );
    assert!(observed.drain_updates().is_empty());
    assert_eq!(gateway.calls("recording_state"), 3);
    handle.cancel();
}

/// WHAT: A finished save refreshes the recordings list once and returns to Idle once
/// WHY: Each completed save adds exactly one recording
#[tokio::test(start_paused = true)]
async fn given_save_in_progress_when_done_then_one_list_refresh_and_one_idle() {
    // Given: Backend stepping through a save
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .reply("saving_progress", json!({ "Saving": [1, 4] }))
        .reply("saving_progress", json!({ "Saving": [4, 4] }))
        .reply("saving_progress", json!("Finalizing"))
        .always("saving_progress", json!("Done"))
        .always(
            "past_videos",
            json!([{ "file_path": "/videos/a.mp4", "duration": 5, "time_recorded": 1_704_067_200 }]),
        );
    let client = client_over(&gateway);

    // When: Running the loop through the save
    let (handle, mut observed) = start_observed(&client);
    let mut updates = Vec::new();
    while updates.last() != Some(&SyncedState::Idle) {
        updates.push(observed.next_update().await);
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Then: Progress, Done, one Idle, one list refresh
    assert_eq!(
        updates,
        [
            SyncedState::saving_progress(1, 4),
            SyncedState::saving_progress(4, 4),
            SyncedState::saving(SavingPhase::Finalizing),
            SyncedState::saving(SavingPhase::Done),
            SyncedState::Idle,
        ]
    );
    assert!(observed.drain_updates().is_empty());
    assert_eq!(gateway.calls("past_videos"), 1);
    assert_eq!(client.recordings().count(), 1);
    handle.cancel();
}

/// WHAT: An unrecognized reply fires the error callback, skips the update and halts ticks
/// WHY: Stale but valid display beats guessing at an unknown shape
#[tokio::test(start_paused = true)]
async fn given_recording_when_reply_unrecognized_then_error_no_update_and_halt() {
    // Given: Backend recording, then replying {"Foo": "bar"}
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .always("saving_progress", Value::Null)
        .reply("recording_state", json!({ "Recording": STARTED }))
        .always("recording_state", json!({ "Foo": "bar" }));
    let client = client_over(&gateway);

    // When: Running past the bad tick
    let (handle, mut observed) = start_observed(&client);
    let first = observed.next_update().await;
    let error = observed.next_error().await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Then: Protocol error, no update for that tick, no further polls
    assert!(matches!(first, SyncedState::Recording { .. }));
    assert!(error.is_protocol());
    assert!(observed.drain_updates().is_empty());
    assert!(observed.drain_errors().is_empty());
    assert_eq!(gateway.calls("recording_state"), 2);
    assert_eq!(client.current(), Some(first));
    handle.cancel();
}

/// WHAT: A transport failure is reported and polling continues on schedule
/// WHY: A momentary IPC hiccup must not require a restart
#[tokio::test(start_paused = true)]
async fn given_recording_when_transport_fails_then_reported_and_polling_continues() {
    // Given: Backend failing one recording poll
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .always("saving_progress", Value::Null)
        .reply("recording_state", json!({ "Recording": STARTED }))
        .fail("recording_state", "ipc hiccup")
        .reply("recording_state", json!({ "Recording": STARTED }))
        .always("recording_state", json!({ "Done": 3 }));
    let client = client_over(&gateway);

    // When: Running the loop
    let (handle, mut observed) = start_observed(&client);
    let mut updates = Vec::new();
    while !matches!(updates.last(), Some(SyncedState::Done { .. })) {
        updates.push(observed.next_update().await);
    }

    // Then: The failure was reported and the loop reached Done
    assert_eq!(updates.len(), 3);
    assert!(observed.drain_errors().iter().all(SyncError::is_transport));
    assert_eq!(gateway.calls("recording_state"), 4);
    handle.cancel();
}

/// WHAT: A failed initial sync is retried after one interval
/// WHY: An unknown state must eventually resolve
#[tokio::test(start_paused = true)]
async fn given_unreachable_backend_at_start_when_retrying_then_state_resolves() {
    // Given: Backend failing the first saving query
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .fail("saving_progress", "backend starting")
        .always("saving_progress", Value::Null)
        .always("recording_state", json!("Idle"));
    let client = client_over(&gateway);

    // When: Running the loop
    let (handle, mut observed) = start_observed(&client);
    let error = observed.next_error().await;
    let state = observed.next_update().await;

    // Then: One transport error, then Idle
    assert!(error.is_transport());
    assert_eq!(state, SyncedState::Idle);
    assert_eq!(gateway.calls("saving_progress"), 2);
    handle.cancel();
}

/// WHAT: Slow replies never overlap
/// WHY: A late reply must not overwrite a newer one
#[tokio::test(start_paused = true)]
async fn given_poll_slower_than_interval_when_recording_then_no_overlapping_queries() {
    // Given: Backend taking 500ms per reply while recording
    let gateway = Arc::new(ScriptedGateway::with_latency(Duration::from_millis(500)));
    gateway
        .always("saving_progress", Value::Null)
        .always("recording_state", json!({ "Recording": STARTED }));
    let client = client_over(&gateway);

    // When: Polling for several seconds
    let (handle, _observed) = start_observed(&client);
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Then: Many polls, never two at once
    assert!(gateway.calls("recording_state") >= 4);
    assert_eq!(gateway.max_in_flight(), 1);
    handle.cancel();
}

/// WHAT: Cancelling twice is harmless
/// WHY: Teardown paths may cancel more than once
#[tokio::test(start_paused = true)]
async fn given_running_loop_when_cancelled_twice_then_no_error() {
    // Given: A running loop
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .always("saving_progress", Value::Null)
        .always("recording_state", json!("Idle"));
    let client = client_over(&gateway);
    let (handle, _observed) = start_observed(&client);

    // When: Cancelling twice
    handle.cancel();
    handle.cancel();

    // Then: Cancelled, nothing else happens
    assert!(handle.is_cancelled());
}

/// WHAT: Results arriving after cancellation are discarded
/// WHY: A torn-down view must not receive callbacks
#[tokio::test(start_paused = true)]
async fn given_query_in_flight_when_cancelled_then_no_callbacks() {
    // Given: A slow backend and a freshly started loop
    let gateway = Arc::new(ScriptedGateway::with_latency(Duration::from_millis(500)));
    gateway
        .always("saving_progress", Value::Null)
        .always("recording_state", json!({ "Recording": STARTED }));
    let client = client_over(&gateway);
    let (handle, mut observed) = start_observed(&client);

    // When: Cancelling while the first query is in flight
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Then: No update or error was delivered
    assert!(observed.drain_updates().is_empty());
    assert!(observed.drain_errors().is_empty());
}

/// WHAT: Starting a second loop cancels the first
/// WHY: Only one loop may own the synced state
#[tokio::test(start_paused = true)]
async fn given_running_loop_when_started_again_then_previous_cancelled() {
    // Given: A running loop
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .always("saving_progress", Value::Null)
        .always("recording_state", json!("Idle"));
    let client = client_over(&gateway);
    let (first, _first_observed) = start_observed(&client);

    // When: Starting another
    let (second, _second_observed) = start_observed(&client);

    // Then: Only the newest is live
    assert!(first.is_cancelled());
    assert!(!second.is_cancelled());
    assert_ne!(first.loop_id(), second.loop_id());
    second.cancel();
}

/// WHAT: Discard shows Discarding before the backend confirms, then the resynced state
/// WHY: Immediate feedback while the backend deletes the capture
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_done_recording_when_discarding_then_optimistic_then_resynced() {
    // Given: Loop showing a Done recording over a slow backend
    let gateway = Arc::new(ScriptedGateway::with_latency(Duration::from_millis(100)));
    gateway
        .always("saving_progress", Value::Null)
        .reply("recording_state", json!({ "Done": 5 }))
        .always("recording_state", json!("Idle"))
        .always("discard_recording", Value::Null);
    let client = client_over(&gateway);
    let (handle, mut observed) = start_observed(&client);
    let done = observed.next_update().await;

    // When: Discarding, observed before and after confirmation
    let discarding = tokio::spawn({
        let client = client.clone();
        async move { client.discard_optimistic().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let during = client.current();
    let resynced = discarding.await.unwrap().unwrap();

    // Then: Done, Discarding, Idle
    assert_eq!(
        done,
        SyncedState::Done {
            duration_seconds: 5
        }
    );
    assert_eq!(during, Some(SyncedState::Discarding));
    assert_eq!(resynced, SyncedState::Idle);
    assert_eq!(
        observed.drain_updates(),
        [SyncedState::Discarding, SyncedState::Idle]
    );
    handle.cancel();
}

/// WHAT: Commands issued while the loop runs are executed and published by the loop
/// WHY: Commands and polls share one serialized channel to the backend
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_idle_loop_when_starting_then_recording_published_and_polled() {
    // Given: Loop showing Idle
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .always("saving_progress", Value::Null)
        .reply("recording_state", json!("Idle"))
        .always("recording_state", json!({ "Recording": STARTED }))
        .always("start_recording", Value::Null);
    let client = client_over(&gateway);
    let (handle, mut observed) = start_observed(&client);
    let idle = observed.next_update().await;

    // When: Starting a recording
    let started = client.start().await.unwrap();
    let published = observed.next_update().await;
    let ticked = observed.next_update().await;

    // Then: Recording is returned, published, and polled again
    assert_eq!(idle, SyncedState::Idle);
    assert!(matches!(started, SyncedState::Recording { .. }));
    assert_eq!(published, started);
    assert_eq!(ticked, started);
    handle.cancel();
}

/// WHAT: Commands after cancellation run directly against the backend
/// WHY: A cancelled loop must not swallow user actions
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_cancelled_loop_when_stopping_then_executed_directly() {
    // Given: A cancelled loop
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .always("saving_progress", Value::Null)
        .always("stop_recording", Value::Null)
        .always("recording_state", json!({ "Done": 2 }));
    let client = client_over(&gateway);
    let (handle, mut observed) = start_observed(&client);
    let _ = observed.next_update().await;
    handle.cancel();

    // When: Stopping
    let state = client.stop().await.unwrap();

    // Then: Done, with no callback delivered
    assert_eq!(
        state,
        SyncedState::Done {
            duration_seconds: 2
        }
    );
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(observed.drain_updates().is_empty());
}

/// WHAT: A finished save left behind by the backend does not decide an unknown state
/// WHY: The backend keeps answering Done after a save, even while a new recording runs
#[tokio::test(start_paused = true)]
async fn given_lingering_save_done_when_loop_starts_then_recording_adopted() {
    // Given: Backend recording, with an old save still reported as Done
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .always("saving_progress", json!("Done"))
        .always("recording_state", json!({ "Recording": STARTED }))
        .always("past_videos", json!([]));
    let client = client_over(&gateway);

    // When: Starting the loop
    let (handle, mut observed) = start_observed(&client);
    let first = observed.next_update().await;
    let second = observed.next_update().await;

    // Then: Recording is shown and the old save triggers no list refresh
    assert!(matches!(first, SyncedState::Recording { .. }));
    assert!(matches!(second, SyncedState::Recording { .. }));
    assert!(gateway.calls("recording_state") >= 2);
    assert_eq!(gateway.calls("past_videos"), 0);
    handle.cancel();
}

/// WHAT: A discard after a completed save resolves from the recording status
/// WHY: Each completed save refreshes the recordings list exactly once
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_completed_save_when_discarding_later_then_no_second_list_refresh() {
    // Given: A loop that watched a save finish, with Done still reported afterwards
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .reply("saving_progress", json!({ "Saving": [1, 4] }))
        .always("saving_progress", json!("Done"))
        .always(
            "past_videos",
            json!([{ "file_path": "/videos/a.mp4", "duration": 5, "time_recorded": 1_704_067_200 }]),
        )
        .always("stop_recording", Value::Null)
        .always("discard_recording", Value::Null)
        .reply("recording_state", json!({ "Done": 5 }))
        .always("recording_state", json!("Idle"));
    let client = client_over(&gateway);
    let (handle, mut observed) = start_observed(&client);
    while observed.next_update().await != SyncedState::Idle {}

    // When: Stopping a new capture and discarding it
    client.stop().await.unwrap();
    let resynced = client.discard_optimistic().await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Then: Done, Discarding, Idle, and still a single list refresh
    assert_eq!(resynced, SyncedState::Idle);
    assert_eq!(
        observed.drain_updates(),
        [
            SyncedState::Done {
                duration_seconds: 5
            },
            SyncedState::Discarding,
            SyncedState::Idle,
        ]
    );
    assert_eq!(gateway.calls("past_videos"), 1);
    handle.cancel();
}

/// WHAT: Dropping every client and handle without cancelling ends the loop
/// WHY: An abandoned loop must not keep polling the backend
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_running_loop_when_all_owners_dropped_then_loop_stops() {
    // Given: A loop polling a recording
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .always("saving_progress", Value::Null)
        .always("recording_state", json!({ "Recording": STARTED }));
    let client = client_over(&gateway);
    let (handle, mut observed) = start_observed(&client);
    let _ = observed.next_update().await;

    // When: Dropping the client and the handle
    drop(client);
    drop(handle);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let polls = gateway.calls("recording_state");
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Then: No more polls and the update callback was released
    assert_eq!(gateway.calls("recording_state"), polls);
    let _ = observed.drain_updates();
    let closed = tokio::time::timeout(Duration::from_secs(1), observed.updates.recv())
        .await
        .unwrap();
    assert!(closed.is_none());
}

/// WHAT: Cancelling from inside the update callback stops all later callbacks
/// WHY: A view may tear itself down in response to a state
#[tokio::test(start_paused = true)]
async fn given_update_callback_when_it_cancels_then_no_further_callbacks() {
    // Given: A recording backend and a callback that cancels its own loop
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .always("saving_progress", Value::Null)
        .always("recording_state", json!({ "Recording": STARTED }));
    let client = client_over(&gateway);
    let slot = Arc::new(OnceLock::<CancelHandle>::new());
    let (update_tx, mut updates) = mpsc::unbounded_channel();

    let handle = client.start_polling_loop(
        {
            let slot = Arc::clone(&slot);
            move |state| {
                let _ = update_tx.send(state);
                if let Some(handle) = slot.get() {
                    handle.cancel();
                }
            }
        },
        |_| {},
    );
    let _ = slot.set(handle.clone());

    // When: Letting several intervals pass
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Then: Exactly one update, loop cancelled
    let delivered = std::iter::from_fn(|| updates.try_recv().ok()).count();
    assert_eq!(delivered, 1);
    assert!(handle.is_cancelled());
}
