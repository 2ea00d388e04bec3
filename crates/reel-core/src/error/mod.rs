use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

/// Status synchronization errors with source location tracking.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The backend was unreachable or rejected the call.
    #[error("Backend call `{command}` failed: {reason} {location}")]
    Transport {
        /// Backend command that was invoked.
        command: String,
        /// Description of the transport failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The backend replied with a shape no decoder recognizes.
    #[error("Unrecognized reply to `{command}`: {reason} {location}")]
    Protocol {
        /// Backend command whose reply could not be interpreted.
        command: String,
        /// Description of the unexpected shape.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A command was routed to a polling loop that stopped before answering.
    #[error("Polling loop closed before the command completed {location}")]
    LoopClosed {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An index did not address an entry of the last observed list.
    #[error("Index {index} out of range for {len} entries {location}")]
    InvalidIndex {
        /// Requested index.
        index: usize,
        /// Number of entries known at the time of the request.
        len: usize,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A list reply could not be deserialized.
    #[error("Failed to decode backend data: {reason} {location}")]
    Decode {
        /// Description of the decoding failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl SyncError {
    /// Builds a [`SyncError::Transport`] at the caller's location.
    #[track_caller]
    pub fn transport(command: impl Into<String>, reason: impl Into<String>) -> Self {
        SyncError::Transport {
            command: command.into(),
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Builds a [`SyncError::Protocol`] at the caller's location.
    #[track_caller]
    pub fn protocol(command: impl Into<String>, reason: impl Into<String>) -> Self {
        SyncError::Protocol {
            command: command.into(),
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// True for failures the next scheduled poll may recover from.
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport { .. })
    }

    /// True when the backend reply could not be interpreted.
    pub fn is_protocol(&self) -> bool {
        matches!(self, SyncError::Protocol { .. })
    }
}

// Manual conversion keeps the call-site location; #[from] cannot fill extra fields.
impl From<serde_json::Error> for SyncError {
    #[track_caller]
    fn from(source: serde_json::Error) -> Self {
        SyncError::Decode {
            reason: source.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`SyncError`].
pub type Result<T> = std::result::Result<T, SyncError>;
