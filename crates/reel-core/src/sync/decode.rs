//! Decoders for the backend's tagged status replies.
//!
//! The backend encodes a status either as a bare string marker (`"Idle"`) or
//! as a single-key object whose key is the marker and whose value is the
//! payload (`{"Recording": 1704067200000}`). Replies are parsed into closed
//! enums here and nowhere else.

use crate::{
    CoreResult, SyncError,
    sync::{SavingPhase, SyncedState},
};

use chrono::{DateTime, Utc};
use serde_json::Value;

const RECORDING_STATE: &str = "recording_state";
const SAVING_PROGRESS: &str = "saving_progress";

/// Decoded reply to `recording_state`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RecordingStatus {
    Idle,
    Recording(DateTime<Utc>),
    Done(u64),
}

/// Decoded non-null reply to `saving_progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SavingStatus {
    Initializing,
    Saving { completed: u64, total: u64 },
    Finalizing,
    Done,
}

impl From<RecordingStatus> for SyncedState {
    fn from(status: RecordingStatus) -> Self {
        match status {
            RecordingStatus::Idle => SyncedState::Idle,
            RecordingStatus::Recording(started_at) => SyncedState::Recording { started_at },
            RecordingStatus::Done(duration_seconds) => SyncedState::Done { duration_seconds },
        }
    }
}

impl From<SavingStatus> for SyncedState {
    fn from(status: SavingStatus) -> Self {
        match status {
            SavingStatus::Initializing => SyncedState::saving(SavingPhase::Initializing),
            SavingStatus::Saving { completed, total } => {
                SyncedState::saving_progress(completed, total)
            }
            SavingStatus::Finalizing => SyncedState::saving(SavingPhase::Finalizing),
            SavingStatus::Done => SyncedState::saving(SavingPhase::Done),
        }
    }
}

/// A marker together with its payload, if it carried a non-null one.
struct Marker<'a> {
    tag: &'a str,
    payload: Option<&'a Value>,
}

fn split_marker(reply: &Value) -> Option<Marker<'_>> {
    match reply {
        Value::String(tag) => Some(Marker {
            tag: tag.as_str(),
            payload: None,
        }),
        Value::Object(map) if map.len() == 1 => map.iter().next().map(|(tag, payload)| Marker {
            tag: tag.as_str(),
            payload: (!payload.is_null()).then_some(payload),
        }),
        _ => None,
    }
}

/// Decode a `recording_state` reply.
pub(crate) fn decode_recording_status(reply: &Value) -> CoreResult<RecordingStatus> {
    let unrecognized = || {
        SyncError::protocol(
            RECORDING_STATE,
            format!("unrecognized recording status shape: {reply}"),
        )
    };

    let marker = split_marker(reply).ok_or_else(unrecognized)?;

    match (marker.tag, marker.payload) {
        ("Idle", None) => Ok(RecordingStatus::Idle),
        ("Recording", Some(payload)) => decode_instant(payload)
            .map(RecordingStatus::Recording)
            .ok_or_else(|| {
                SyncError::protocol(
                    RECORDING_STATE,
                    format!("recording start is not a timestamp: {payload}"),
                )
            }),
        ("Done", Some(payload)) => payload.as_u64().map(RecordingStatus::Done).ok_or_else(|| {
            SyncError::protocol(
                RECORDING_STATE,
                format!("done duration is not a whole number of seconds: {payload}"),
            )
        }),
        _ => Err(unrecognized()),
    }
}

/// Decode a `saving_progress` reply. `null` means no save is active.
pub(crate) fn decode_saving_status(reply: &Value) -> CoreResult<Option<SavingStatus>> {
    if reply.is_null() {
        return Ok(None);
    }

    let unrecognized = || {
        SyncError::protocol(
            SAVING_PROGRESS,
            format!("unrecognized saving status shape: {reply}"),
        )
    };

    let marker = split_marker(reply).ok_or_else(unrecognized)?;

    let status = match (marker.tag, marker.payload) {
        ("Initializing", None) => SavingStatus::Initializing,
        ("Saving", Some(payload)) => {
            let (completed, total) = decode_pair(payload).ok_or_else(|| {
                SyncError::protocol(
                    SAVING_PROGRESS,
                    format!("saving progress is not a [completed, total] pair: {payload}"),
                )
            })?;
            SavingStatus::Saving { completed, total }
        }
        ("Finalizing", None) => SavingStatus::Finalizing,
        ("Done", None) => SavingStatus::Done,
        _ => return Err(unrecognized()),
    };

    Ok(Some(status))
}

/// RFC 3339 string or integral epoch milliseconds.
fn decode_instant(payload: &Value) -> Option<DateTime<Utc>> {
    match payload {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|instant| instant.with_timezone(&Utc)),
        Value::Number(millis) => millis.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn decode_pair(payload: &Value) -> Option<(u64, u64)> {
    match payload.as_array()?.as_slice() {
        [completed, total] => Some((completed.as_u64()?, total.as_u64()?)),
        _ => None,
    }
}
