use crate::config::{
    DEFAULT_LATENCY_MS, DEFAULT_SAVE_FRAMES, DEFAULT_SAVE_STEP_MS, default_latency_ms,
    default_save_frames, default_save_step_ms,
};

use std::time::Duration;

use reel_core::MockTiming;
use serde::{Deserialize, Serialize};

/// Development backend timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Delay before every backend reply, in milliseconds.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Delay between saving progress steps, in milliseconds.
    #[serde(default = "default_save_step_ms")]
    pub save_step_ms: u64,

    /// Number of frames a save reports progress over.
    #[serde(default = "default_save_frames")]
    pub save_frames: u64,
}

impl BackendConfig {
    /// Mock backend timing built from this section.
    pub fn timing(&self) -> MockTiming {
        MockTiming {
            latency: Duration::from_millis(self.latency_ms),
            save_step: Duration::from_millis(self.save_step_ms),
            save_frames: self.save_frames,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            latency_ms: DEFAULT_LATENCY_MS,
            save_step_ms: DEFAULT_SAVE_STEP_MS,
            save_frames: DEFAULT_SAVE_FRAMES,
        }
    }
}
