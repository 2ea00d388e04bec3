mod client;
mod decode;
mod poller;
mod state;

pub use {
    client::{DEFAULT_POLL_INTERVAL, StatusSyncClient, SyncOptions},
    poller::CancelHandle,
    state::{SavingPhase, SyncedState},
};

#[cfg(test)]
pub(crate) use decode::{decode_recording_status, decode_saving_status, RecordingStatus, SavingStatus};
