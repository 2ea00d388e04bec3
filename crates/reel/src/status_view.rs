//! Terminal rendering of synced states, recordings and capture options.

use crate::AppResult;

use std::io::Write;

use chrono::{DateTime, Utc};
use reel_core::{
    PointerStyle, RecorderSettings, RecordingEntry, Resolution, SavingPhase, SyncedState,
    format::{describe_recorded_at, file_name, format_duration, format_elapsed},
};

const BAR_WIDTH: usize = 20;

/// Writes status lines and listings to a terminal.
pub struct StatusView<W> {
    out: W,
}

impl<W: Write> StatusView<W> {
    /// Render to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Print the line for `state`.
    pub fn render_state(&mut self, state: &SyncedState, now: DateTime<Utc>) -> AppResult<()> {
        writeln!(self.out, "{}", status_line(state, now))?;
        self.out.flush()?;
        Ok(())
    }

    /// Print saved recordings, newest first, numbered from 1.
    pub fn render_recordings(
        &mut self,
        entries: &[RecordingEntry],
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if entries.is_empty() {
            writeln!(self.out, "No recordings yet.")?;
        }

        for (number, entry) in entries.iter().rev().enumerate() {
            writeln!(self.out, "{}", recording_line(number + 1, entry, now))?;
        }

        self.out.flush()?;
        Ok(())
    }

    /// Print the current settings and what can be chosen.
    pub fn render_options(
        &mut self,
        settings: &RecorderSettings,
        resolutions: &[Resolution],
        frame_rates: &[u32],
    ) -> AppResult<()> {
        writeln!(self.out, "Resolution:")?;
        for (number, resolution) in resolutions.iter().enumerate() {
            let marker = if settings.resolution == Some(*resolution) { '*' } else { ' ' };
            writeln!(
                self.out,
                " {marker} {}. {}x{}",
                number + 1,
                resolution.width,
                resolution.height
            )?;
        }

        let rates = frame_rates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(self.out, "Frame rate: {} fps (offered: {rates})", settings.frame_rate)?;

        writeln!(self.out, "Pointer:")?;
        for index in 0..=usize::from(PointerStyle::SOLID_DESIGNS) + 1 {
            if let Some(style) = PointerStyle::from_wire_index(index) {
                let marker = if settings.pointer == style { '*' } else { ' ' };
                writeln!(self.out, " {marker} {index}. {}", pointer_label(style))?;
            }
        }

        self.out.flush()?;
        Ok(())
    }

    /// Print a one-line message.
    pub fn notice(&mut self, message: &str) -> AppResult<()> {
        writeln!(self.out, "{message}")?;
        self.out.flush()?;
        Ok(())
    }
}

/// One-line description of a synced state.
pub fn status_line(state: &SyncedState, now: DateTime<Utc>) -> String {
    match state {
        SyncedState::Idle => "Idle. Type `start` to record.".to_string(),
        SyncedState::Recording { .. } => {
            format!("REC {}", format_elapsed(state.elapsed(now)))
        }
        SyncedState::Done { duration_seconds } => format!(
            "Recorded {}. Type `save` or `discard`.",
            format_duration(*duration_seconds)
        ),
        SyncedState::Saving { phase, fraction } => format!(
            "{} [{}] {:>3}%",
            phase_label(*phase),
            progress_bar(*fraction),
            (fraction * 100.0).round() as u32
        ),
        SyncedState::Discarding => "Discarding...".to_string(),
    }
}

/// Fixed-width bar for a fraction in `[0, 1]`.
pub fn progress_bar(fraction: f64) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

/// Convert a 1-based position in the newest-first listing to a backend index.
pub fn recording_index(number: usize, len: usize) -> Option<usize> {
    (1..=len).contains(&number).then(|| len - number)
}

fn recording_line(number: usize, entry: &RecordingEntry, now: DateTime<Utc>) -> String {
    let path = entry.file_path.to_string_lossy();
    let mut line = format!(
        "{number:>3}. {}  {}  {}",
        file_name(&path),
        format_duration(entry.duration_secs),
        describe_recorded_at(entry.recorded_at, now)
    );

    if let Some((width, height)) = entry.resolution {
        line.push_str(&format!("  {width}x{height}"));
    }

    line
}

fn phase_label(phase: SavingPhase) -> &'static str {
    match phase {
        SavingPhase::Initializing => "Preparing",
        SavingPhase::InProgress => "Encoding",
        SavingPhase::Finalizing => "Finalizing",
        SavingPhase::Done => "Saved",
    }
}

fn pointer_label(style: PointerStyle) -> String {
    match style {
        PointerStyle::Hidden => "hidden".to_string(),
        PointerStyle::System => "system".to_string(),
        PointerStyle::Solid(design) => format!("solid #{design}"),
    }
}
