//! Capture settings mirrored from the backend.
//!
//! Local values change only after the backend accepts the update.

use crate::{
    CoreResult, SharedGateway, SyncError,
    gateway::{BackendCommand, call},
};

use std::{
    panic::Location,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Frame rate assumed until the user picks one.
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Output height preferred when the backend offers it.
pub const DEFAULT_RESOLUTION_HEIGHT: u32 = 720;

/// Output resolution, encoded on the wire as `[width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl From<[u32; 2]> for Resolution {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<Resolution> for [u32; 2] {
    fn from(resolution: Resolution) -> Self {
        [resolution.width, resolution.height]
    }
}

/// How the pointer is drawn into the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerStyle {
    /// Pointer is left out.
    #[default]
    Hidden,
    /// The system pointer as captured.
    System,
    /// One of the built-in solid pointer designs, numbered from 1.
    Solid(u8),
}

impl PointerStyle {
    /// Number of built-in solid designs.
    pub const SOLID_DESIGNS: u8 = 4;

    /// Index the backend uses for this style.
    pub fn wire_index(self) -> usize {
        match self {
            PointerStyle::Hidden => 0,
            PointerStyle::System => 1,
            PointerStyle::Solid(design) => usize::from(design) + 1,
        }
    }

    /// Style for a backend index, if one exists.
    pub fn from_wire_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PointerStyle::Hidden),
            1 => Some(PointerStyle::System),
            _ => u8::try_from(index - 1)
                .ok()
                .filter(|design| (1..=Self::SOLID_DESIGNS).contains(design))
                .map(PointerStyle::Solid),
        }
    }
}

/// Settings the next recording will use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderSettings {
    /// Selected resolution, unknown until offered resolutions are loaded.
    pub resolution: Option<Resolution>,
    /// Frames per second.
    pub frame_rate: u32,
    /// Pointer rendering.
    pub pointer: PointerStyle,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            resolution: None,
            frame_rate: DEFAULT_FRAME_RATE,
            pointer: PointerStyle::default(),
        }
    }
}

#[derive(Default)]
struct OptionsState {
    resolutions: Vec<Resolution>,
    frame_rates: Vec<u32>,
    settings: RecorderSettings,
}

/// Capture settings and the choices the backend offers.
#[derive(Clone)]
pub struct RecorderOptions {
    gateway: SharedGateway,
    state: Arc<Mutex<OptionsState>>,
}

impl RecorderOptions {
    /// Create a mirror with default settings and nothing offered yet.
    pub fn new(gateway: SharedGateway) -> Self {
        Self {
            gateway,
            state: Arc::new(Mutex::new(OptionsState::default())),
        }
    }

    /// Fetch the offered resolutions and frame rates.
    ///
    /// Selects the 720p resolution if none is selected and it is offered.
    ///
    /// # Errors
    ///
    /// `Transport` if a call fails, `Decode` if a list is malformed.
    #[instrument(skip(self))]
    pub async fn load(&self) -> CoreResult<()> {
        let resolutions: Vec<Resolution> = serde_json::from_value(
            call(self.gateway.as_ref(), &BackendCommand::AvailableResolutions).await?,
        )?;
        let frame_rates: Vec<u32> = serde_json::from_value(
            call(self.gateway.as_ref(), &BackendCommand::AvailableFrameRates).await?,
        )?;

        info!(
            resolutions = resolutions.len(),
            frame_rates = frame_rates.len(),
            "Recorder options loaded"
        );

        let mut state = self.lock();
        if state.settings.resolution.is_none() {
            state.settings.resolution = resolutions
                .iter()
                .copied()
                .find(|resolution| resolution.height == DEFAULT_RESOLUTION_HEIGHT);
        }
        state.resolutions = resolutions;
        state.frame_rates = frame_rates;

        Ok(())
    }

    /// Resolutions offered by the backend.
    pub fn available_resolutions(&self) -> Vec<Resolution> {
        self.lock().resolutions.clone()
    }

    /// Frame rates offered by the backend.
    pub fn available_frame_rates(&self) -> Vec<u32> {
        self.lock().frame_rates.clone()
    }

    /// Current settings.
    pub fn settings(&self) -> RecorderSettings {
        self.lock().settings
    }

    /// Select the offered resolution at `index`.
    ///
    /// # Errors
    ///
    /// `InvalidIndex` if nothing is offered at `index`, otherwise any backend
    /// failure.
    #[instrument(skip(self))]
    pub async fn set_resolution(&self, index: usize) -> CoreResult<Resolution> {
        let resolution = {
            let state = self.lock();
            state
                .resolutions
                .get(index)
                .copied()
                .ok_or_else(|| invalid_index(index, state.resolutions.len()))?
        };

        call(
            self.gateway.as_ref(),
            &BackendCommand::UpdateResolution { index },
        )
        .await?;

        self.lock().settings.resolution = Some(resolution);
        info!(
            width = resolution.width,
            height = resolution.height,
            "Resolution updated"
        );

        Ok(resolution)
    }

    /// Select a frame rate.
    ///
    /// # Errors
    ///
    /// Any backend failure.
    #[instrument(skip(self))]
    pub async fn set_frame_rate(&self, frame_rate: u32) -> CoreResult<()> {
        call(
            self.gateway.as_ref(),
            &BackendCommand::UpdateFrameRate { frame_rate },
        )
        .await?;

        self.lock().settings.frame_rate = frame_rate;
        info!(frame_rate, "Frame rate updated");

        Ok(())
    }

    /// Select how the pointer is drawn.
    ///
    /// # Errors
    ///
    /// `InvalidIndex` for a solid design outside `1..=4`, otherwise any
    /// backend failure.
    #[instrument(skip(self))]
    pub async fn set_pointer(&self, pointer: PointerStyle) -> CoreResult<()> {
        let index = pointer.wire_index();
        if PointerStyle::from_wire_index(index).is_none() {
            return Err(invalid_index(
                index,
                usize::from(PointerStyle::SOLID_DESIGNS) + 2,
            ));
        }

        call(self.gateway.as_ref(), &BackendCommand::UpdatePointer { index }).await?;

        self.lock().settings.pointer = pointer;
        info!(?pointer, "Pointer style updated");

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, OptionsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[track_caller]
fn invalid_index(index: usize, len: usize) -> SyncError {
    SyncError::InvalidIndex {
        index,
        len,
        location: ErrorLocation::from(Location::caller()),
    }
}
