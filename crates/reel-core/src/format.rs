//! Display helpers for recording times and files.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Recording length as `00:SS`, `MM:SS` or `HH:MM:SS`.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{hours:02}:{mins:02}:{secs:02}")
    } else {
        format!("{mins:02}:{secs:02}")
    }
}

/// Live timer text, `HH:MM:SS.cc` with hundredths.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let hundredths = elapsed.subsec_millis() / 10;

    format!(
        "{:02}:{:02}:{:02}.{:02}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        hundredths
    )
}

/// How long ago a recording was made, in whole days relative to `now`.
///
/// `Today`, `Yesterday`, `N days ago` within a week, else the calendar date.
pub fn describe_recorded_at(recorded_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match (now - recorded_at).num_days() {
        days if days <= 0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        days if days < 7 => format!("{days} days ago"),
        _ => recorded_at.format("%Y-%m-%d").to_string(),
    }
}

/// Final component of a path written with either separator.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
