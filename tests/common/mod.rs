#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use reelcast::clip::{Clip, ClipId, ClipWithDuration, MediaKind};
use reelcast::engine::{EngineBinding, FractionFn, LogSink, MediaEngine};
use reelcast::error::{ReelcastError, Result};
use reelcast::media::{ConcatManifest, MediaCommand};

/// In-memory engine: a flat name -> bytes map plus a command recorder.
///
/// Outputs are synthesized from inputs so tests can check what went in:
/// a concat render writes its inputs joined with `|`, every other
/// command writes `out:` followed by the input bytes.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    files: BTreeMap<String, Vec<u8>>,
    writes: Vec<String>,
    deletes: Vec<String>,
    commands: Vec<MediaCommand>,
    manifests: Vec<String>,
    durations: HashMap<Vec<u8>, f64>,
    loads: usize,
    failing_loads: usize,
    exec_failure: Option<String>,
    write_failure_at: Option<usize>,
    progress_steps: Vec<f64>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        let engine = Self::default();
        engine.state().progress_steps = vec![0.25, 0.5, 0.4, 0.9];
        Arc::new(engine)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// The next `count` loads fail as if the runtime could not be fetched.
    pub fn fail_next_loads(&self, count: usize) {
        self.state().failing_loads = count;
    }

    /// Every exec fails after writing a partial output.
    pub fn fail_exec(&self, message: &str) {
        self.state().exec_failure = Some(message.to_string());
    }

    /// The write with this zero-based index fails.
    pub fn fail_write_at(&self, index: usize) {
        self.state().write_failure_at = Some(index);
    }

    /// Probe result for any staged entry holding exactly `content`.
    pub fn set_duration(&self, content: &[u8], seconds: f64) {
        self.state().durations.insert(content.to_vec(), seconds);
    }

    pub fn set_progress_steps(&self, steps: &[f64]) {
        self.state().progress_steps = steps.to_vec();
    }

    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        self.state().files.clone()
    }

    /// Names in the order they were written.
    pub fn writes(&self) -> Vec<String> {
        self.state().writes.clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.state().deletes.clone()
    }

    pub fn commands(&self) -> Vec<MediaCommand> {
        self.state().commands.clone()
    }

    /// Manifest scripts as they were when the render command ran.
    pub fn manifests(&self) -> Vec<String> {
        self.state().manifests.clone()
    }

    pub fn load_count(&self) -> usize {
        self.state().loads
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn load(&self, log: LogSink) -> Result<()> {
        let mut state = self.state();
        state.loads += 1;
        if state.failing_loads > 0 {
            state.failing_loads -= 1;
            return Err(ReelcastError::EngineLoad("network unreachable".to_string()));
        }
        log("fake engine loaded");
        Ok(())
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        let index = state.writes.len();
        state.writes.push(name.to_string());
        if state.write_failure_at == Some(index) {
            return Err(ReelcastError::Engine(format!("disk full writing {}", name)));
        }
        state.files.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.state()
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| ReelcastError::Engine(format!("{} not found", name)))
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        state.deletes.push(name.to_string());
        state.files.remove(name);
        Ok(())
    }

    async fn probe_duration(&self, name: &str) -> Result<f64> {
        let state = self.state();
        let data = state
            .files
            .get(name)
            .ok_or_else(|| ReelcastError::Engine(format!("{} not found", name)))?;
        state
            .durations
            .get(data)
            .copied()
            .ok_or_else(|| ReelcastError::Engine(format!("cannot probe {}", name)))
    }

    async fn exec(&self, command: &MediaCommand, on_fraction: FractionFn<'_>) -> Result<()> {
        let steps = {
            let mut state = self.state();
            state.commands.push(command.clone());
            let output = command.args.last().cloned().unwrap_or_default();

            if let Some(message) = state.exec_failure.clone() {
                state.files.insert(output, b"partial".to_vec());
                return Err(ReelcastError::Engine(message));
            }

            let input = command.value_of("-i").unwrap_or_default().to_string();
            let source = state
                .files
                .get(&input)
                .cloned()
                .ok_or_else(|| ReelcastError::Engine(format!("{}: No such file", input)))?;

            let produced = if command.value_of("-f") == Some("concat") {
                let script = String::from_utf8(source).unwrap();
                state.manifests.push(script.clone());
                let mut joined = Vec::new();
                for (i, name) in ConcatManifest::parse_script(&script).iter().enumerate() {
                    if i > 0 {
                        joined.push(b'|');
                    }
                    joined.extend(state.files.get(name).cloned().unwrap_or_default());
                }
                joined
            } else {
                [b"out:".as_slice(), source.as_slice()].concat()
            };
            state.files.insert(output, produced);
            state.progress_steps.clone()
        };

        for step in steps {
            on_fraction(step);
        }
        Ok(())
    }
}

pub async fn ready_binding(engine: &Arc<FakeEngine>) -> Arc<EngineBinding> {
    let binding = Arc::new(EngineBinding::new(engine.clone()));
    binding.ensure_ready(reelcast::engine::tracing_log_sink()).await.unwrap();
    binding
}

pub fn video_clip(id: u64, name: &str, content: &[u8]) -> Clip {
    let mut clip = Clip::from_bytes(name, MediaKind::Video, "video/mp4", content);
    clip.id = Some(ClipId(id));
    clip
}

pub fn unsaved_clip(name: &str, content: &[u8]) -> Clip {
    Clip::from_bytes(name, MediaKind::Video, "video/mp4", content)
}

pub fn measured(clip: Clip, duration: f64) -> ClipWithDuration {
    ClipWithDuration { clip, duration }
}

/// Collects every reported percent.
#[derive(Default)]
pub struct ProgressLog {
    seen: Mutex<Vec<u8>>,
}

impl ProgressLog {
    pub fn record(&self, percent: u8) {
        self.seen.lock().unwrap().push(percent);
    }

    pub fn values(&self) -> Vec<u8> {
        self.seen.lock().unwrap().clone()
    }
}
