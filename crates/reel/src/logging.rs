//! Console and optional rolling-file log output.

use crate::{AppResult, config::Config, config::LoggingConfig};

use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "reel=info,reel_core=info";
const LOG_FILE_PREFIX: &str = "reel.log";

/// Install the global subscriber.
///
/// The console layer writes to stderr so it never interleaves with the status
/// display on stdout. `RUST_LOG` overrides the default filter for both layers.
pub fn setup(config: &LoggingConfig) -> AppResult<()> {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    let file_layer = if config.file {
        let log_dir = Config::log_dir()?;
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
        let layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(file_appender);

        let layer = if config.json {
            layer.json().with_filter(env_filter()).boxed()
        } else {
            layer.with_filter(env_filter()).boxed()
        };

        Some((layer, log_dir))
    } else {
        None
    };

    match file_layer {
        Some((file_layer, log_dir)) => {
            tracing_subscriber::registry()
                .with(console_layer)
                .with(file_layer)
                .init();
            info!(log_dir = ?log_dir, json = config.json, "File logging enabled");
        }
        None => {
            tracing_subscriber::registry().with(console_layer).init();
        }
    }

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
