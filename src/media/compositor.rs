//! Timeline render: N ordered clips in, one MP4 out.
//!
//! Clips are staged in timeline order, listed in an explicit concat
//! manifest, and re-encoded in a single pass through a fit-to-box filter
//! so sources with different aspect ratios land on one canvas. The
//! manifest is the only thing that decides output order; scratch names
//! are never sorted or listed.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::executor::probe_or_zero;
use super::{MediaCommand, MediaCommandBuilder};
use crate::clip::{Clip, MediaBlob};
use crate::engine::{EngineBinding, ProgressFn, ScratchSet};
use crate::error::{ReelcastError, Result};
use crate::timeline::RenderSettings;

/// Ordered input list for the concat demuxer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcatManifest {
    entries: Vec<String>,
}

impl ConcatManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.entries.push(name.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `file '<name>'` line per entry, in order.
    pub fn to_script(&self) -> String {
        self.entries
            .iter()
            .map(|name| format!("file '{}'", name.replace('\'', r"'\''")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Entry names read back from a script produced by [`to_script`](Self::to_script).
    pub fn parse_script(script: &str) -> Vec<String> {
        script
            .lines()
            .filter_map(|line| line.trim().strip_prefix("file '")?.strip_suffix('\'').map(str::to_string))
            .map(|name| name.replace(r"'\''", "'"))
            .collect()
    }
}

impl FromIterator<String> for ConcatManifest {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Everything the encoding pass needs, computed without touching the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPlan {
    pub manifest: ConcatManifest,
    pub manifest_name: String,
    pub output_name: String,
    pub command: MediaCommand,
}

impl CompositionPlan {
    pub fn build(
        commands: &MediaCommandBuilder,
        staged: &[String],
        manifest_name: &str,
        output_name: &str,
        settings: RenderSettings,
        expected_duration: f64,
    ) -> Self {
        let manifest: ConcatManifest = staged.iter().cloned().collect();
        let (width, height) = settings.resolution.dimensions();
        let command = commands
            .render(manifest_name, output_name, width, height, settings.quality.crf())
            .expect_duration(expected_duration);
        Self {
            manifest,
            manifest_name: manifest_name.to_string(),
            output_name: output_name.to_string(),
            command,
        }
    }
}

pub struct TimelineCompositor {
    binding: Arc<EngineBinding>,
    commands: MediaCommandBuilder,
}

impl TimelineCompositor {
    pub fn new(binding: Arc<EngineBinding>, commands: MediaCommandBuilder) -> Self {
        Self { binding, commands }
    }

    /// Concatenate `clips` in order into one MP4 at the given settings.
    ///
    /// Preconditions are checked before the engine is touched. Anything
    /// that fails after staging began surfaces as `Composition` once
    /// every staged entry has been removed.
    pub async fn render(
        &self,
        clips: &[Clip],
        settings: RenderSettings,
        on_progress: ProgressFn<'_>,
    ) -> Result<MediaBlob> {
        if clips.is_empty() {
            return Err(ReelcastError::EmptyTimeline);
        }
        let payloads = clips
            .iter()
            .map(|clip| clip.resolve_bytes().map(|bytes| (clip, bytes)))
            .collect::<Result<Vec<_>>>()?;

        info!(
            clips = clips.len(),
            resolution = %settings.resolution,
            quality = %settings.quality,
            "Rendering timeline"
        );

        let lease = self.binding.acquire()?;
        let engine = lease.engine();
        let mut scratch = ScratchSet::new("render");

        let result = async {
            let mut staged = Vec::with_capacity(payloads.len());
            let mut expected_duration = 0.0;
            for (index, (clip, bytes)) in payloads.iter().enumerate() {
                let name = scratch
                    .stage(engine, &format!("input{}", index), &clip.extension(), bytes)
                    .await?;
                expected_duration += probe_or_zero(engine, &name).await;
                staged.push(name);
            }

            let manifest_name = scratch.reserve("concat", "txt");
            let output_name = scratch.reserve("output", "mp4");
            let plan = CompositionPlan::build(
                &self.commands,
                &staged,
                &manifest_name,
                &output_name,
                settings,
                expected_duration,
            );
            debug!(manifest = ?plan.manifest.entries(), "Concat manifest");

            engine
                .write_file(&plan.manifest_name, plan.manifest.to_script().as_bytes())
                .await?;
            lease.run(&plan.command, on_progress).await?;
            engine.read_file(&plan.output_name).await
        }
        .await;

        scratch.release(engine).await;
        match &result {
            Ok(data) => info!(bytes = data.len(), "Timeline render completed"),
            Err(e) => warn!(error = %e, "Timeline render failed"),
        }
        result.map(MediaBlob::mp4).map_err(ReelcastError::into_composition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{QualityTier, Resolution};

    #[test]
    fn test_manifest_keeps_insertion_order_across_digit_boundary() {
        let names: Vec<String> = (0..12).map(|i| format!("render-x-input{}.mp4", i)).collect();
        let manifest: ConcatManifest = names.iter().cloned().collect();
        let script = manifest.to_script();
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines[2], "file 'render-x-input2.mp4'");
        assert_eq!(lines[10], "file 'render-x-input10.mp4'");
        assert_eq!(ConcatManifest::parse_script(&script), names);
    }

    #[test]
    fn test_manifest_escapes_quotes() {
        let mut manifest = ConcatManifest::new();
        manifest.push("it's.mp4");
        assert_eq!(manifest.to_script(), r"file 'it'\''s.mp4'");
        assert_eq!(ConcatManifest::parse_script(&manifest.to_script()), ["it's.mp4"]);
    }

    #[test]
    fn test_plan_uses_tier_and_resolution() {
        let staged = vec!["a.mp4".to_string(), "b.mov".to_string()];
        let plan = CompositionPlan::build(
            &MediaCommandBuilder::default(),
            &staged,
            "list.txt",
            "out.mp4",
            RenderSettings::new(Resolution::Landscape720, QualityTier::High),
            10.0,
        );
        assert_eq!(plan.manifest.entries(), staged.as_slice());
        assert_eq!(plan.command.value_of("-crf"), Some("18"));
        assert_eq!(plan.command.value_of("-i"), Some("list.txt"));
        assert!(plan.command.value_of("-vf").unwrap().contains("pad=1280:720"));
        assert_eq!(plan.command.expected_duration, Some(10.0));
    }
}
