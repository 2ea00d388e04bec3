use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

/// A persisted recording as listed by the backend.
///
/// The backend encodes the recording time either as bare epoch seconds or as
/// an object carrying `secs_since_epoch`; both decode to the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingEntry {
    /// Location of the encoded video.
    pub file_path: PathBuf,
    /// Length in whole seconds.
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    /// When the recording was saved.
    #[serde(
        rename = "time_recorded",
        serialize_with = "serialize_recorded_at",
        deserialize_with = "deserialize_recorded_at"
    )]
    pub recorded_at: DateTime<Utc>,
    /// Capture resolution as `(width, height)`, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<(u32, u32)>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordedAtRepr {
    Seconds(i64),
    Wrapped { secs_since_epoch: i64 },
}

#[derive(Serialize)]
struct WireRecordedAt {
    secs_since_epoch: i64,
    nanos_since_epoch: u32,
}

fn deserialize_recorded_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = match RecordedAtRepr::deserialize(deserializer)? {
        RecordedAtRepr::Seconds(secs) => secs,
        RecordedAtRepr::Wrapped { secs_since_epoch } => secs_since_epoch,
    };

    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| D::Error::custom(format!("recording time {secs} is out of range")))
}

fn serialize_recorded_at<S>(recorded_at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    WireRecordedAt {
        secs_since_epoch: recorded_at.timestamp(),
        nanos_since_epoch: recorded_at.timestamp_subsec_nanos(),
    }
    .serialize(serializer)
}
