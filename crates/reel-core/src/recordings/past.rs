//! Read projection of the backend's persisted recordings.

use crate::{
    CoreResult, SharedGateway, SyncError,
    gateway::{BackendCommand, call},
    recordings::RecordingEntry,
};

use std::{panic::Location, sync::Arc};

use error_location::ErrorLocation;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

/// Chronological list of recordings, mirrored from the backend.
///
/// The backend owns the list; this projection only reads it, removes entries
/// by index, and publishes each refreshed copy to subscribers. Ordering is the
/// backend's (oldest first); reversing for display is up to the consumer.
#[derive(Clone)]
pub struct PastRecordings {
    gateway: SharedGateway,
    entries: Arc<watch::Sender<Vec<RecordingEntry>>>,
}

impl PastRecordings {
    /// Create an empty projection over `gateway`.
    pub fn new(gateway: SharedGateway) -> Self {
        let (entries, _) = watch::channel(Vec::new());

        Self {
            gateway,
            entries: Arc::new(entries),
        }
    }

    /// Reload the list from the backend and publish it.
    ///
    /// # Errors
    ///
    /// `Transport` if the call fails, `Decode` if an entry is malformed.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> CoreResult<Vec<RecordingEntry>> {
        let reply = call(self.gateway.as_ref(), &BackendCommand::PastVideos).await?;

        let entries: Vec<RecordingEntry> = match reply {
            Value::Null => Vec::new(),
            reply => serde_json::from_value(reply)?,
        };

        info!(count = entries.len(), "Recordings list refreshed");

        self.entries.send_replace(entries.clone());
        Ok(entries)
    }

    /// Delete the recording at `index`, then reload the list.
    ///
    /// The index addresses the last published list.
    ///
    /// # Errors
    ///
    /// `InvalidIndex` if `index` is past the end of the list, otherwise any
    /// backend failure.
    #[instrument(skip(self))]
    pub async fn remove(&self, index: usize) -> CoreResult<Vec<RecordingEntry>> {
        let entry = self.entry(index)?;

        call(
            self.gateway.as_ref(),
            &BackendCommand::RemovePreviousRecording { index },
        )
        .await?;

        debug!(path = ?entry.file_path, "Recording removed");

        self.refresh().await
    }

    /// Ask the backend to reveal the recording at `index`.
    ///
    /// # Errors
    ///
    /// `InvalidIndex` if `index` is past the end of the list, otherwise any
    /// backend failure.
    #[instrument(skip(self))]
    pub async fn open_location(&self, index: usize) -> CoreResult<()> {
        let entry = self.entry(index)?;

        call(
            self.gateway.as_ref(),
            &BackendCommand::OpenFileLocation {
                path: entry.file_path,
            },
        )
        .await?;

        Ok(())
    }

    /// Copy of the last published list.
    pub fn entries(&self) -> Vec<RecordingEntry> {
        self.entries.borrow().clone()
    }

    /// Number of recordings in the last published list.
    pub fn count(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Receive every list published after a refresh.
    pub fn subscribe(&self) -> watch::Receiver<Vec<RecordingEntry>> {
        self.entries.subscribe()
    }

    #[track_caller]
    fn entry(&self, index: usize) -> CoreResult<RecordingEntry> {
        let entries = self.entries.borrow();

        entries
            .get(index)
            .cloned()
            .ok_or_else(|| SyncError::InvalidIndex {
                index,
                len: entries.len(),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
