use std::sync::Arc;
use tracing::{info, warn};

use super::{MediaCommand, MediaCommandBuilder, VideoFilter};
use crate::clip::{Clip, ClipWithDuration, MediaBlob};
use crate::engine::{EngineBinding, MediaEngine, ProgressFn, ProgressReporter, ScratchSet};
use crate::error::{ReelcastError, Result};
use crate::timeline::{ExportHeight, TrimRange};

/// Runs one operation against one clip and returns one MP4 blob.
///
/// Input and output are staged under unique scratch names and removed
/// again once the output has been read back, on every path.
pub struct ClipExecutor {
    binding: Arc<EngineBinding>,
    commands: MediaCommandBuilder,
}

impl ClipExecutor {
    pub fn new(binding: Arc<EngineBinding>, commands: MediaCommandBuilder) -> Self {
        Self { binding, commands }
    }

    /// Stream-copy cut. Cut points snap to the nearest prior keyframe.
    pub async fn trim(
        &self,
        clip: &ClipWithDuration,
        start: f64,
        end: f64,
        on_progress: ProgressFn<'_>,
    ) -> Result<MediaBlob> {
        let range = TrimRange::checked(start, end, clip.duration)?;
        info!(clip = %clip.clip.name, start = range.start, end = range.end, "Trimming clip");

        self.run_single("trim", &clip.clip, Some(clip.duration), on_progress, |input, output, _| {
            self.commands.trim(input, output, range)
        })
        .await
    }

    /// Re-encode through exactly the translator's expression for `filter`.
    pub async fn apply_filter(
        &self,
        clip: &Clip,
        filter: VideoFilter,
        on_progress: ProgressFn<'_>,
    ) -> Result<MediaBlob> {
        let expression = filter.to_expression();
        info!(clip = %clip.name, filter = filter.name(), expression = %expression, "Applying filter");

        self.run_single("filter", clip, None, on_progress, |input, output, duration| {
            self.commands
                .filter(input, output, &expression)
                .expect_duration(duration)
        })
        .await
    }

    /// Scale into a 16:9 box of the given height, padding with black.
    pub async fn export_resolution(
        &self,
        clip: &Clip,
        height: ExportHeight,
        on_progress: ProgressFn<'_>,
    ) -> Result<MediaBlob> {
        let (width, height) = (height.width(), height.height());
        info!(clip = %clip.name, width, height, "Exporting clip");

        self.run_single("export", clip, None, on_progress, |input, output, duration| {
            self.commands
                .export(input, output, width, height)
                .expect_duration(duration)
        })
        .await
    }

    /// Cut into two stream-copied parts at `at` seconds.
    pub async fn split(
        &self,
        clip: &ClipWithDuration,
        at: f64,
        on_progress: ProgressFn<'_>,
    ) -> Result<(MediaBlob, MediaBlob)> {
        let duration = clip.duration;
        if !(at.is_finite() && at > 0.0 && (duration <= 0.0 || at < duration)) {
            return Err(ReelcastError::InvalidRange {
                start: at,
                end: duration,
                duration,
            });
        }
        info!(clip = %clip.clip.name, at, "Splitting clip");

        let bytes = clip.clip.resolve_bytes()?;
        let lease = self.binding.acquire()?;
        let engine = lease.engine();
        let mut scratch = ScratchSet::new("split");

        let reporter = ProgressReporter::new(on_progress);
        let first_half = |p: u8| reporter.report_percent(p / 2);
        let second_half = |p: u8| reporter.report_percent(50 + p / 2);

        let result = async {
            let input = scratch.stage(engine, "input", &clip.clip.extension(), &bytes).await?;
            let head = scratch.reserve("part1", "mp4");
            let tail = scratch.reserve("part2", "mp4");

            lease
                .run(&self.commands.split_head(&input, &head, at), &first_half)
                .await?;
            lease
                .run(&self.commands.split_tail(&input, &tail, at, duration), &second_half)
                .await?;

            let head = engine.read_file(&head).await?;
            let tail = engine.read_file(&tail).await?;
            Ok((MediaBlob::mp4(head), MediaBlob::mp4(tail)))
        }
        .await;

        scratch.release(engine).await;
        result.map_err(ReelcastError::into_encoding)
    }

    /// Remux video returned by a generation service so it can be saved.
    pub async fn finalize_generated(&self, data: &[u8], on_progress: ProgressFn<'_>) -> Result<MediaBlob> {
        if data.is_empty() {
            return Err(ReelcastError::UnresolvedClip("generated video".to_string()));
        }
        let lease = self.binding.acquire()?;
        let engine = lease.engine();
        let mut scratch = ScratchSet::new("generated");

        let result = async {
            let input = scratch.stage(engine, "input", "mp4", data).await?;
            let output = scratch.reserve("output", "mp4");
            lease.run(&self.commands.remux(&input, &output), on_progress).await?;
            engine.read_file(&output).await
        }
        .await;

        scratch.release(engine).await;
        result.map(MediaBlob::mp4).map_err(ReelcastError::into_encoding)
    }

    /// Probe a clip's duration; 0 when the clip cannot be probed.
    pub async fn measure(&self, clip: &Clip) -> Result<ClipWithDuration> {
        let bytes = match clip.resolve_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(clip = %clip.name, error = %e, "Cannot measure unresolved clip");
                return Ok(ClipWithDuration {
                    clip: clip.clone(),
                    duration: 0.0,
                });
            }
        };
        let lease = self.binding.acquire()?;
        let engine = lease.engine();
        let mut scratch = ScratchSet::new("probe");

        let duration = match scratch.stage(engine, "input", &clip.extension(), &bytes).await {
            Ok(input) => probe_or_zero(engine, &input).await,
            Err(e) => {
                warn!(clip = %clip.name, error = %e, "Failed to stage clip for probing");
                0.0
            }
        };

        scratch.release(engine).await;
        Ok(ClipWithDuration {
            clip: clip.clone(),
            duration,
        })
    }

    /// Measure every clip, keeping timeline order.
    pub async fn measure_all(&self, clips: &[Clip]) -> Result<Vec<ClipWithDuration>> {
        let mut measured = Vec::with_capacity(clips.len());
        for clip in clips {
            measured.push(self.measure(clip).await?);
        }
        Ok(measured)
    }

    async fn run_single<F>(
        &self,
        operation: &str,
        clip: &Clip,
        known_duration: Option<f64>,
        on_progress: ProgressFn<'_>,
        build: F,
    ) -> Result<MediaBlob>
    where
        F: FnOnce(&str, &str, f64) -> MediaCommand,
    {
        let bytes = clip.resolve_bytes()?;
        let lease = self.binding.acquire()?;
        let engine = lease.engine();
        let mut scratch = ScratchSet::new(operation);

        let result = async {
            let input = scratch.stage(engine, "input", &clip.extension(), &bytes).await?;
            let output = scratch.reserve("output", "mp4");
            let duration = match known_duration {
                Some(duration) => duration,
                None => probe_or_zero(engine, &input).await,
            };
            let command = build(&input, &output, duration);
            lease.run(&command, on_progress).await?;
            engine.read_file(&output).await
        }
        .await;

        scratch.release(engine).await;
        match &result {
            Ok(data) => info!(operation, bytes = data.len(), "Operation completed"),
            Err(e) => warn!(operation, error = %e, "Operation failed"),
        }
        result.map(MediaBlob::mp4).map_err(ReelcastError::into_encoding)
    }
}

pub(crate) async fn probe_or_zero(engine: &dyn MediaEngine, name: &str) -> f64 {
    match engine.probe_duration(name).await {
        Ok(duration) => duration,
        Err(e) => {
            warn!(name, error = %e, "Duration probe failed");
            0.0
        }
    }
}
