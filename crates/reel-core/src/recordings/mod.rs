mod entry;
mod past;

pub use {entry::RecordingEntry, past::PastRecordings};
