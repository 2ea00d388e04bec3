use crate::config::{DEFAULT_POLL_INTERVAL_MS, default_poll_interval_ms};

use std::time::Duration;

use reel_core::SyncOptions;
use serde::{Deserialize, Serialize};

/// Status polling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay between status checks while recording or saving, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl SyncConfig {
    /// Client options built from this section.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}
