//! In-memory backend for running the client without the native recorder.

use crate::{BackendGateway, CoreResult, RecordingEntry, SyncError};

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::{debug, info};

/// Timing of the simulated backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockTiming {
    /// Delay before every reply.
    pub latency: Duration,
    /// Delay between saving progress steps.
    pub save_step: Duration,
    /// Number of frames a save reports progress over.
    pub save_frames: u64,
}

impl Default for MockTiming {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(100),
            save_step: Duration::from_millis(250),
            save_frames: 8,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Capture {
    Idle,
    Recording { started_at: DateTime<Utc> },
    Done { duration_secs: u64 },
}

#[derive(Debug, Clone, Copy)]
enum Save {
    Initializing,
    Saving(u64, u64),
    Finalizing,
    Done,
}

struct MockState {
    capture: Capture,
    save: Option<Save>,
    recordings: Vec<RecordingEntry>,
    resolutions: Vec<[u32; 2]>,
    frame_rates: Vec<u32>,
    resolution_index: usize,
    frame_rate: u32,
    pointer: usize,
    saved_count: u32,
}

/// Simulated backend mirroring the native command set.
///
/// Recording time is taken from the wall clock; a save steps through
/// `Initializing`, `Saving(n, total)`, `Finalizing` and `Done` on a background
/// task and appends the new recording to the list. Like the native backend,
/// `saving_progress` keeps answering `Done` until the next save starts.
pub struct MockBackend {
    timing: MockTiming,
    state: Arc<Mutex<MockState>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockBackend {
    /// Create an idle backend with no recordings.
    pub fn new(timing: MockTiming) -> Self {
        Self {
            timing,
            state: Arc::new(Mutex::new(MockState {
                capture: Capture::Idle,
                save: None,
                recordings: Vec::new(),
                resolutions: vec![[640, 360], [854, 480], [1280, 720], [1920, 1080]],
                frame_rates: vec![15, 24, 30, 60],
                resolution_index: 2,
                frame_rate: 30,
                pointer: 1,
                saved_count: 0,
            })),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Seed the persisted recordings list.
    pub fn with_recordings(self, recordings: Vec<RecordingEntry>) -> Self {
        lock(&self.state).recordings = recordings;
        self
    }

    /// How many times `command` has been invoked.
    pub fn invocations(&self, command: &str) -> usize {
        lock(&self.calls).get(command).copied().unwrap_or(0)
    }

    fn dispatch(&self, command: &str, args: &Value) -> CoreResult<Value> {
        let mut state = lock(&self.state);

        match command {
            "recording_state" => Ok(match state.capture {
                Capture::Idle => json!("Idle"),
                Capture::Recording { started_at } => {
                    json!({ "Recording": started_at.timestamp_millis() })
                }
                Capture::Done { duration_secs } => json!({ "Done": duration_secs }),
            }),
            "saving_progress" => Ok(match state.save {
                None => Value::Null,
                Some(Save::Initializing) => json!("Initializing"),
                Some(Save::Saving(completed, total)) => json!({ "Saving": [completed, total] }),
                Some(Save::Finalizing) => json!("Finalizing"),
                Some(Save::Done) => json!("Done"),
            }),
            "start_recording" => {
                if matches!(state.capture, Capture::Idle) {
                    state.capture = Capture::Recording {
                        started_at: Utc::now(),
                    };
                    info!("Mock: recording started");
                }
                Ok(Value::Null)
            }
            "stop_recording" => {
                if let Capture::Recording { started_at } = state.capture {
                    let duration_secs = u64::try_from((Utc::now() - started_at).num_seconds())
                        .unwrap_or_default();
                    state.capture = Capture::Done { duration_secs };
                    info!(duration_secs, "Mock: recording stopped");
                }
                Ok(Value::Null)
            }
            "discard_recording" => {
                if matches!(state.capture, Capture::Done { .. }) {
                    state.capture = Capture::Idle;
                    info!("Mock: recording discarded");
                }
                Ok(Value::Null)
            }
            "save_recording" => {
                let saving = matches!(
                    state.save,
                    Some(Save::Initializing | Save::Saving(..) | Save::Finalizing)
                );
                if let (Capture::Done { duration_secs }, false) = (state.capture, saving) {
                    state.capture = Capture::Idle;
                    state.save = Some(Save::Initializing);
                    state.saved_count += 1;
                    let entry = RecordingEntry {
                        file_path: PathBuf::from(format!(
                            "recordings/reel-{:04}.mp4",
                            state.saved_count
                        )),
                        duration_secs,
                        recorded_at: Utc::now(),
                        resolution: state
                            .resolutions
                            .get(state.resolution_index)
                            .map(|[width, height]| (*width, *height)),
                    };
                    tokio::spawn(simulate_save(Arc::clone(&self.state), self.timing, entry));
                    info!("Mock: save started");
                }
                Ok(Value::Null)
            }
            "past_videos" => Ok(serde_json::to_value(&state.recordings)?),
            "remove_previous_recording_by_index" => {
                let index = index_arg(command, args)?;
                if index >= state.recordings.len() {
                    return Err(SyncError::transport(
                        command,
                        format!("no recording at index {index}"),
                    ));
                }
                state.recordings.remove(index);
                Ok(Value::Null)
            }
            "open_file_location" => {
                let path = args
                    .get("path")
                    .and_then(Value::as_str)
                    .ok_or_else(|| SyncError::transport(command, "missing `path` argument"))?;
                info!(path, "Mock: opening file location");
                Ok(Value::Null)
            }
            "available_resolutions" => Ok(json!(state.resolutions)),
            "available_frame_rates" => Ok(json!(state.frame_rates)),
            "update_resolution" => {
                let index = index_arg(command, args)?;
                if index >= state.resolutions.len() {
                    return Err(SyncError::transport(
                        command,
                        format!("no resolution at index {index}"),
                    ));
                }
                state.resolution_index = index;
                info!(index, "Mock: resolution updated");
                Ok(Value::Null)
            }
            "update_frame_rate" => {
                let frame_rate = args
                    .get("frameRate")
                    .and_then(Value::as_u64)
                    .and_then(|rate| u32::try_from(rate).ok())
                    .ok_or_else(|| SyncError::transport(command, "missing `frameRate` argument"))?;
                state.frame_rate = frame_rate;
                info!(frame_rate = state.frame_rate, "Mock: frame rate updated");
                Ok(Value::Null)
            }
            "update_pointer" => {
                state.pointer = index_arg(command, args)?;
                info!(pointer = state.pointer, "Mock: pointer updated");
                Ok(Value::Null)
            }
            unknown => Err(SyncError::transport(unknown, "unknown command")),
        }
    }
}

#[async_trait]
impl BackendGateway for MockBackend {
    async fn invoke(&self, command: &str, args: Value) -> CoreResult<Value> {
        *lock(&self.calls).entry(command.to_string()).or_default() += 1;

        tokio::time::sleep(self.timing.latency).await;

        let reply = self.dispatch(command, &args)?;
        debug!(command, %reply, "Mock: replied");

        Ok(reply)
    }
}

async fn simulate_save(state: Arc<Mutex<MockState>>, timing: MockTiming, entry: RecordingEntry) {
    tokio::time::sleep(timing.save_step).await;

    for frame in 1..=timing.save_frames {
        lock(&state).save = Some(Save::Saving(frame, timing.save_frames));
        tokio::time::sleep(timing.save_step).await;
    }

    lock(&state).save = Some(Save::Finalizing);
    tokio::time::sleep(timing.save_step).await;

    let mut state = lock(&state);
    state.recordings.push(entry);
    state.save = Some(Save::Done);
    info!("Mock: save finished");
}

fn index_arg(command: &str, args: &Value) -> CoreResult<usize> {
    args.get("index")
        .and_then(Value::as_u64)
        .and_then(|index| usize::try_from(index).ok())
        .ok_or_else(|| SyncError::transport(command, "missing `index` argument"))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
