use chrono::{DateTime, Utc};
use reel_core::SyncedState;
use tracing::info;
use uuid::Uuid;

/// Recording session as observed from published states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingSession {
    /// Not currently recording.
    #[default]
    Idle,
    /// The backend is recording.
    Recording {
        /// When the backend reports capture began.
        started_at: DateTime<Utc>,
        /// Unique session ID for log correlation.
        session_id: Uuid,
    },
}

impl RecordingSession {
    /// Follow a published state, opening or closing a session on the edges.
    pub fn observe(&mut self, state: &SyncedState) {
        match (*self, state) {
            (RecordingSession::Idle, SyncedState::Recording { started_at }) => {
                let session_id = Uuid::new_v4();
                *self = RecordingSession::Recording {
                    started_at: *started_at,
                    session_id,
                };
                info!(session_id = %session_id, %started_at, "Recording session started");
            }
            (RecordingSession::Recording { session_id, .. }, SyncedState::Done { duration_seconds }) => {
                *self = RecordingSession::Idle;
                info!(session_id = %session_id, duration_seconds, "Recording session finished");
            }
            (RecordingSession::Recording { session_id, .. }, other)
                if !matches!(other, SyncedState::Recording { .. }) =>
            {
                *self = RecordingSession::Idle;
                info!(session_id = %session_id, state = ?other, "Recording session ended");
            }
            _ => {}
        }
    }

    /// Session ID of the recording in progress.
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            RecordingSession::Idle => None,
            RecordingSession::Recording { session_id, .. } => Some(*session_id),
        }
    }
}
