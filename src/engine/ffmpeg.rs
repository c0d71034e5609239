use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{OnceLock, PoisonError, RwLock};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use super::progress::ProgressState;
use super::{FractionFn, LogSink, MediaEngine, validate_scratch_name};
use crate::config::EngineConfig;
use crate::error::{ReelcastError, Result};
use crate::media::MediaCommand;

const STDERR_TAIL_LINES: usize = 40;

/// Engine backed by the `ffmpeg` and `ffprobe` executables.
///
/// Commands run with the scratch workspace as working directory, so
/// scratch names double as relative paths.
pub struct FfmpegEngine {
    config: EngineConfig,
    workspace: OnceLock<TempDir>,
    log: RwLock<Option<LogSink>>,
}

impl FfmpegEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            workspace: OnceLock::new(),
            log: RwLock::new(None),
        }
    }

    /// Scratch workspace directory, once loaded.
    pub fn workspace_path(&self) -> Option<&Path> {
        self.workspace.get().map(TempDir::path)
    }

    fn workspace(&self) -> Result<&Path> {
        self.workspace_path().ok_or(ReelcastError::EngineNotReady)
    }

    fn entry(&self, name: &str) -> Result<PathBuf> {
        validate_scratch_name(name)?;
        Ok(self.workspace()?.join(name))
    }

    fn log_sink(&self) -> Option<LogSink> {
        self.log.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn version_of(binary: &str) -> Result<String> {
        let output = Command::new(binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ReelcastError::EngineLoad(format!("{} not found: {}", binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelcastError::EngineLoad(format!(
                "{} version check failed: {}",
                binary,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or("Unknown version").to_string())
    }

    fn create_workspace(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("reelcast-scratch-");
        let dir = match &self.config.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        };
        dir.map_err(|e| ReelcastError::EngineLoad(format!("Failed to create scratch workspace: {}", e)))
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn load(&self, log: LogSink) -> Result<()> {
        *self.log.write().unwrap_or_else(PoisonError::into_inner) = Some(log.clone());

        log("Checking media engine binaries...");
        for binary in [&self.config.ffmpeg_path, &self.config.ffprobe_path] {
            let version = Self::version_of(binary).await?;
            log(&version);
        }

        if self.workspace.get().is_none() {
            let dir = self.create_workspace()?;
            // a concurrent load may have won; its directory is kept
            let _ = self.workspace.set(dir);
        }
        let path = self.workspace()?.display().to_string();
        log(&format!("Scratch workspace ready at {}", path));
        info!(workspace = %path, "Media engine loaded");
        Ok(())
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.entry(name)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| ReelcastError::Engine(format!("Failed to stage {}: {}", name, e)))
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.entry(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| ReelcastError::Engine(format!("Failed to read {}: {}", name, e)))
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.entry(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // reserved names are released even if nothing was written
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReelcastError::Engine(format!("Failed to delete {}: {}", name, e))),
        }
    }

    async fn probe_duration(&self, name: &str) -> Result<f64> {
        validate_scratch_name(name)?;
        let output = Command::new(&self.config.ffprobe_path)
            .current_dir(self.workspace()?)
            .args(["-v", "error", "-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(name)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ReelcastError::Engine(format!("Failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelcastError::Engine(format!(
                "Probing {} failed: {}",
                name,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| ReelcastError::Engine(format!("No duration reported for {}", name)))
    }

    async fn exec(&self, command: &MediaCommand, on_fraction: FractionFn<'_>) -> Result<()> {
        let workspace = self.workspace()?;
        debug!(args = ?command.args, "Executing ffmpeg: {}", command.description);

        let mut child = Command::new(&self.config.ffmpeg_path)
            .current_dir(workspace)
            .args(["-hide_banner", "-nostats", "-progress", "pipe:1"])
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReelcastError::Engine(format!("Failed to start ffmpeg: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReelcastError::Engine("Failed to capture ffmpeg stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelcastError::Engine("Failed to capture ffmpeg stderr".to_string()))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let log = self.log_sink();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(log) = &log {
                    log(&line);
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail).join("\n")
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ReelcastError::Engine(format!("Failed reading ffmpeg progress: {}", e)))?
        {
            if let Some((key, value)) = line.trim().split_once('=') {
                if state.update(key, value) {
                    if let Some(fraction) = state.fraction(command.expected_duration) {
                        on_fraction(fraction);
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ReelcastError::Engine(format!("Failed to wait on ffmpeg: {}", e)))?;
        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|e| format!("<failed to join stderr reader: {}>", e));

        if !status.success() {
            return Err(ReelcastError::Engine(format!(
                "{} failed ({}): {}",
                command.description,
                status,
                stderr_output.trim()
            )));
        }

        Ok(())
    }
}
