use chrono::{DateTime, Utc};
use serde::Serialize;

/// Unified view of the backend's recording and saving status.
///
/// Serialized for the presentation layer as an internally tagged object, e.g.
/// `{"state":"Recording","startedAt":"2024-01-01T00:00:00Z"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all_fields = "camelCase")]
pub enum SyncedState {
    /// Nothing captured and nothing pending.
    Idle,
    /// Capture in progress.
    Recording {
        /// Instant the backend reports capture began.
        started_at: DateTime<Utc>,
    },
    /// Capture finished, awaiting a save or discard decision.
    Done {
        /// Length of the unsaved recording in whole seconds.
        duration_seconds: u64,
    },
    /// Recording is being persisted.
    Saving {
        /// Current saving phase.
        phase: SavingPhase,
        /// Progress in `[0, 1]`.
        fraction: f64,
    },
    /// Placeholder shown between a discard request and the next resync.
    Discarding,
}

impl SyncedState {
    /// Saving state for a phase whose fraction is fixed.
    pub fn saving(phase: SavingPhase) -> Self {
        let fraction = match phase {
            SavingPhase::Initializing | SavingPhase::InProgress => 0.0,
            SavingPhase::Finalizing | SavingPhase::Done => 1.0,
        };
        SyncedState::Saving { phase, fraction }
    }

    /// Saving state for `completed` of `total` frames written.
    pub fn saving_progress(completed: u64, total: u64) -> Self {
        SyncedState::Saving {
            phase: SavingPhase::InProgress,
            fraction: progress_fraction(completed, total),
        }
    }

    /// Time spent recording so far, measured against `now`.
    ///
    /// Zero for every state except [`SyncedState::Recording`], and never
    /// negative when the backend clock runs ahead of ours.
    pub fn elapsed(&self, now: DateTime<Utc>) -> std::time::Duration {
        match self {
            SyncedState::Recording { started_at } => {
                (now - *started_at).to_std().unwrap_or_default()
            }
            _ => std::time::Duration::ZERO,
        }
    }

    /// Whether capture settings may be edited in this state.
    ///
    /// Only an idle backend accepts resolution, frame rate or pointer changes.
    pub fn accepts_settings_change(&self) -> bool {
        matches!(self, SyncedState::Idle)
    }

    /// A save still being written. A finished save is not active.
    pub(crate) fn is_active_save(&self) -> bool {
        matches!(self, SyncedState::Saving { phase, .. } if *phase != SavingPhase::Done)
    }
}

/// Phase of an in-progress save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SavingPhase {
    /// Encoder is being prepared; fraction is 0.
    Initializing,
    /// Frames are being encoded; fraction is completed / total.
    #[serde(rename = "Saving")]
    InProgress,
    /// Container is being finalized; fraction is 1.
    Finalizing,
    /// Save finished; fraction is 1.
    Done,
}

/// `completed / total` clamped to `[0, 1]`, with an empty total mapping to 0.
pub(crate) fn progress_fraction(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64).clamp(0.0, 1.0)
}
