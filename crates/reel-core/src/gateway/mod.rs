//! Command channel to the native recording backend.
//!
//! The backend owns capture, encoding and storage. This crate only ever talks
//! to it through [`BackendGateway::invoke`], a request/response call keyed by a
//! command name with JSON arguments.

mod mock;

pub use mock::{MockBackend, MockTiming};

use crate::CoreResult;

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde_json::{Value, json};

/// Request/response channel to the native backend.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Invoke `command` with `args` and return the raw reply.
    ///
    /// Implementations report unreachable backends and rejected calls as
    /// [`SyncError::Transport`](crate::SyncError::Transport).
    async fn invoke(&self, command: &str, args: Value) -> CoreResult<Value>;
}

/// Shared handle to a gateway.
pub type SharedGateway = Arc<dyn BackendGateway>;

/// Every backend command this crate issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    /// Query the live recording status.
    RecordingState,
    /// Query the live saving status.
    SavingProgress,
    /// Begin capturing.
    StartRecording,
    /// Stop capturing, keeping the recording unsaved.
    StopRecording,
    /// Throw away the unsaved recording.
    DiscardRecording,
    /// Persist the unsaved recording.
    SaveRecording,
    /// List persisted recordings in chronological order.
    PastVideos,
    /// Delete the persisted recording at `index`.
    RemovePreviousRecording {
        /// Position in the chronological list.
        index: usize,
    },
    /// Reveal a recording in the platform file browser.
    OpenFileLocation {
        /// Recording file path.
        path: PathBuf,
    },
    /// List the capture resolutions the backend offers.
    AvailableResolutions,
    /// List the frame rates the backend offers.
    AvailableFrameRates,
    /// Select a resolution by index into the offered list.
    UpdateResolution {
        /// Index into the offered resolutions.
        index: usize,
    },
    /// Select a frame rate.
    UpdateFrameRate {
        /// Frames per second.
        frame_rate: u32,
    },
    /// Select the pointer rendering by wire index.
    UpdatePointer {
        /// Wire index of the pointer style.
        index: usize,
    },
}

impl BackendCommand {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::RecordingState => "recording_state",
            BackendCommand::SavingProgress => "saving_progress",
            BackendCommand::StartRecording => "start_recording",
            BackendCommand::StopRecording => "stop_recording",
            BackendCommand::DiscardRecording => "discard_recording",
            BackendCommand::SaveRecording => "save_recording",
            BackendCommand::PastVideos => "past_videos",
            BackendCommand::RemovePreviousRecording { .. } => "remove_previous_recording_by_index",
            BackendCommand::OpenFileLocation { .. } => "open_file_location",
            BackendCommand::AvailableResolutions => "available_resolutions",
            BackendCommand::AvailableFrameRates => "available_frame_rates",
            BackendCommand::UpdateResolution { .. } => "update_resolution",
            BackendCommand::UpdateFrameRate { .. } => "update_frame_rate",
            BackendCommand::UpdatePointer { .. } => "update_pointer",
        }
    }

    /// JSON arguments sent alongside the command.
    pub fn args(&self) -> Value {
        match self {
            BackendCommand::RemovePreviousRecording { index }
            | BackendCommand::UpdateResolution { index }
            | BackendCommand::UpdatePointer { index } => json!({ "index": index }),
            BackendCommand::OpenFileLocation { path } => {
                json!({ "path": path.to_string_lossy() })
            }
            BackendCommand::UpdateFrameRate { frame_rate } => json!({ "frameRate": frame_rate }),
            _ => Value::Null,
        }
    }
}

/// Invoke a typed command through a gateway.
pub(crate) async fn call(gateway: &dyn BackendGateway, command: &BackendCommand) -> CoreResult<Value> {
    gateway.invoke(command.name(), command.args()).await
}
