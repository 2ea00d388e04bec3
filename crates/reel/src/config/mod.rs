mod backend_config;
#[allow(clippy::module_inception)]
mod config;
mod logging_config;
mod sync_config;

pub(crate) use {
    backend_config::BackendConfig, config::Config, logging_config::LoggingConfig,
    sync_config::SyncConfig,
};

use std::ops::RangeInclusive;

pub(crate) const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
pub(crate) const POLL_INTERVAL_RANGE_MS: RangeInclusive<u64> = 20..=5000;
pub(crate) const DEFAULT_LATENCY_MS: u64 = 100;
pub(crate) const DEFAULT_SAVE_STEP_MS: u64 = 250;
pub(crate) const DEFAULT_SAVE_FRAMES: u64 = 8;
pub(crate) const DEFAULT_LOG_TO_FILE: bool = false;
pub(crate) const DEFAULT_LOG_JSON: bool = false;

pub(crate) fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

pub(crate) fn default_latency_ms() -> u64 {
    DEFAULT_LATENCY_MS
}

pub(crate) fn default_save_step_ms() -> u64 {
    DEFAULT_SAVE_STEP_MS
}

pub(crate) fn default_save_frames() -> u64 {
    DEFAULT_SAVE_FRAMES
}

pub(crate) fn default_log_to_file() -> bool {
    DEFAULT_LOG_TO_FILE
}

pub(crate) fn default_log_json() -> bool {
    DEFAULT_LOG_JSON
}
