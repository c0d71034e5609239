// Media engine layer
//
// - MediaEngine: the raw engine contract (scratch workspace + exec)
// - ffmpeg: process-backed implementation
// - binding: load state machine and single in-flight lease
// - scratch: staged-name bookkeeping with guaranteed release
// - progress: progress parsing and percent reporting

pub mod binding;
pub mod ffmpeg;
pub mod progress;
pub mod scratch;

use async_trait::async_trait;
use std::sync::Arc;

pub use binding::*;
pub use ffmpeg::FfmpegEngine;
pub use progress::ProgressReporter;
pub use scratch::ScratchSet;

use crate::error::{ReelcastError, Result};
use crate::media::MediaCommand;

/// Receives every log line the engine emits.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Receives fractional completion in `[0, 1]` while a command runs.
pub type FractionFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Receives integer percent in `0..=100`.
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Log sink that forwards engine output to tracing at debug level.
pub fn tracing_log_sink() -> LogSink {
    Arc::new(|line: &str| tracing::debug!(target: "reelcast::engine", "{}", line))
}

/// Progress callback that drops every update.
pub fn no_progress(_: u8) {}

/// Main trait for the media-processing engine
///
/// All file names are flat names inside the engine's private scratch
/// workspace. Implementations assume one operation at a time; the
/// [`EngineBinding`] enforces that.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// One-time load of the engine runtime
    async fn load(&self, log: LogSink) -> Result<()>;

    /// Stage bytes under `name`
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Read back a scratch entry
    async fn read_file(&self, name: &str) -> Result<Vec<u8>>;

    /// Remove a scratch entry
    async fn delete_file(&self, name: &str) -> Result<()>;

    /// Playback duration in seconds of a staged entry
    async fn probe_duration(&self, name: &str) -> Result<f64>;

    /// Run one command to completion
    async fn exec(&self, command: &MediaCommand, on_fraction: FractionFn<'_>) -> Result<()>;
}

/// Reject names that would escape the scratch workspace.
pub fn validate_scratch_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(ReelcastError::Engine(format!("Invalid scratch name '{}'", name)));
    }
    Ok(())
}
