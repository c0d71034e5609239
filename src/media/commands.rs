use crate::media::filter::fit_box_filter;
use crate::timeline::TrimRange;

/// Engine command: ordered arguments plus what progress is measured against.
///
/// Inputs and outputs are scratch-workspace names, never host paths.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub args: Vec<String>,
    pub description: String,
    /// Seconds of output the command is expected to produce, when known.
    pub expected_duration: Option<f64>,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S: Into<String>>(description: S) -> Self {
        Self {
            args: Vec::new(),
            description: description.into(),
            expected_duration: None,
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input(self, name: &str) -> Self {
        self.arg("-i").arg(name)
    }

    pub fn output(self, name: &str) -> Self {
        self.arg(name)
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy every stream without re-encoding
    pub fn copy_streams(self) -> Self {
        self.arg("-c").arg("copy")
    }

    pub fn seek_start(self, secs: f64) -> Self {
        self.arg("-ss").arg(format_seconds(secs))
    }

    pub fn seek_to(self, secs: f64) -> Self {
        self.arg("-to").arg(format_seconds(secs))
    }

    pub fn duration(self, secs: f64) -> Self {
        self.arg("-t").arg(format_seconds(secs))
    }

    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.arg("-crf").arg(crf.to_string())
    }

    pub fn preset<S: Into<String>>(self, preset: S) -> Self {
        self.arg("-preset").arg(preset)
    }

    pub fn pixel_format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-pix_fmt").arg(format)
    }

    /// Move the moov atom up front for progressive playback
    pub fn faststart(self) -> Self {
        self.arg("-movflags").arg("+faststart")
    }

    /// Read the next input through the concat demuxer
    pub fn concat_demuxer(self) -> Self {
        self.args(["-f", "concat", "-safe", "0"])
    }

    pub fn expect_duration(mut self, secs: f64) -> Self {
        self.expected_duration = (secs.is_finite() && secs > 0.0).then_some(secs);
        self
    }

    /// The value following `flag`, if present.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

/// Seconds as ffmpeg accepts them: no exponent, no trailing zeros.
pub fn format_seconds(secs: f64) -> String {
    let s = format!("{:.3}", secs);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" { "0".to_string() } else { s.to_string() }
}

/// Builds the exact command for each clip and timeline operation
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    preset: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(preset: S) -> Self {
        Self {
            preset: preset.into(),
        }
    }

    pub fn preset(&self) -> &str {
        &self.preset
    }

    /// Stream-copy cut; cut points snap to keyframes
    pub fn trim(&self, input: &str, output: &str, range: TrimRange) -> MediaCommand {
        MediaCommand::new(format!(
            "Trim ({}s to {}s)",
            format_seconds(range.start),
            format_seconds(range.end)
        ))
        .input(input)
        .seek_start(range.start)
        .seek_to(range.end)
        .copy_streams()
        .overwrite()
        .output(output)
        .expect_duration(range.length())
    }

    pub fn split_head(&self, input: &str, output: &str, at: f64) -> MediaCommand {
        MediaCommand::new(format!("Split part 1 (0s to {}s)", format_seconds(at)))
            .input(input)
            .duration(at)
            .copy_streams()
            .overwrite()
            .output(output)
            .expect_duration(at)
    }

    pub fn split_tail(&self, input: &str, output: &str, at: f64, duration: f64) -> MediaCommand {
        MediaCommand::new(format!("Split part 2 (from {}s)", format_seconds(at)))
            .seek_start(at)
            .input(input)
            .copy_streams()
            .overwrite()
            .output(output)
            .expect_duration(duration - at)
    }

    /// Re-encode through a filter graph expression
    pub fn filter(&self, input: &str, output: &str, expression: &str) -> MediaCommand {
        self.web_h264(
            MediaCommand::new(format!("Apply filter {}", expression))
                .input(input)
                .video_filter(expression),
        )
        .pixel_format("yuv420p")
        .audio_codec("aac")
        .faststart()
        .overwrite()
        .output(output)
    }

    pub fn export(&self, input: &str, output: &str, width: u32, height: u32) -> MediaCommand {
        self.web_h264(
            MediaCommand::new(format!("Export to {}x{}", width, height))
                .input(input)
                .video_filter(fit_box_filter(width, height)),
        )
        .crf(23)
        .audio_codec("aac")
        .faststart()
        .overwrite()
        .output(output)
    }

    /// Single encoding pass over a concat manifest
    pub fn render(&self, manifest: &str, output: &str, width: u32, height: u32, crf: u8) -> MediaCommand {
        self.web_h264(
            MediaCommand::new(format!("Render timeline to {}x{} (crf {})", width, height, crf))
                .concat_demuxer()
                .input(manifest)
                .video_filter(fit_box_filter(width, height)),
        )
        .crf(crf)
        .audio_codec("aac")
        .faststart()
        .overwrite()
        .output(output)
    }

    /// Container-only rewrite with fast start
    pub fn remux(&self, input: &str, output: &str) -> MediaCommand {
        MediaCommand::new("Remux for progressive playback")
            .input(input)
            .copy_streams()
            .faststart()
            .overwrite()
            .output(output)
    }

    fn web_h264(&self, cmd: MediaCommand) -> MediaCommand {
        cmd.video_codec("libx264").preset(self.preset.as_str())
    }
}

impl Default for MediaCommandBuilder {
    fn default() -> Self {
        Self::new("veryfast")
    }
}
