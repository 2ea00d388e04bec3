use crate::config::{DEFAULT_LOG_JSON, DEFAULT_LOG_TO_FILE, default_log_json, default_log_to_file};

use serde::{Deserialize, Serialize};

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a daily rolling file in the data directory.
    #[serde(default = "default_log_to_file")]
    pub file: bool,

    /// Write the log file as JSON lines instead of plain text.
    #[serde(default = "default_log_json")]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: DEFAULT_LOG_TO_FILE,
            json: DEFAULT_LOG_JSON,
        }
    }
}
