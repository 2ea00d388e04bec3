//! Reel Core Library
//!
//! Status synchronization client for a screen recorder whose capture,
//! encoding and storage run in a separate native backend. The client polls the
//! backend, decodes its tagged status replies into a [`SyncedState`], and
//! forwards start/stop/discard/save commands.
//!
//! # Example
//!
//! ```no_run
//! use reel_core::{CoreResult, MockBackend, MockTiming, StatusSyncClient, SyncOptions};
//!
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let gateway = Arc::new(MockBackend::new(MockTiming::default()));
//!     let client = StatusSyncClient::new(gateway, SyncOptions::default());
//!
//!     let handle = client.start_polling_loop(
//!         |state| println!("{state:?}"),
//!         |error| eprintln!("{error}"),
//!     );
//!
//!     client.start().await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(3)).await;
//!     client.stop().await?;
//!
//!     handle.cancel();
//!     Ok(())
//! }
//! ```

pub mod format;
mod error;
mod gateway;
mod options;
mod recordings;
mod sync;

pub use {
    error::Result as CoreResult,
    error::SyncError,
    gateway::{BackendCommand, BackendGateway, MockBackend, MockTiming, SharedGateway},
    options::{
        DEFAULT_FRAME_RATE, DEFAULT_RESOLUTION_HEIGHT, PointerStyle, RecorderOptions,
        RecorderSettings, Resolution,
    },
    recordings::{PastRecordings, RecordingEntry},
    sync::{CancelHandle, DEFAULT_POLL_INTERVAL, SavingPhase, StatusSyncClient, SyncOptions, SyncedState},
};

#[cfg(test)]
mod tests;
