//! Editor session persistence.
//!
//! The snapshot is a small JSON record holding the ordered clip ids and
//! the render settings. It is written by the debounced [`AutoSaver`] and
//! read once by [`restore`] when the editor starts.

pub mod autosave;
pub mod editor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use tracing::{info, warn};

pub use autosave::{AutoSaver, SaveStatus};
pub use editor::EditingSession;

use crate::clip::{Clip, ClipId};
use crate::error::{ReelcastError, Result};
use crate::store::ClipStore;
use crate::timeline::{QualityTier, RenderSettings, Resolution};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub timeline_clip_ids: Vec<ClipId>,
    #[serde(default)]
    pub render_resolution: Resolution,
    #[serde(default)]
    pub render_quality: QualityTier,
}

impl SessionSnapshot {
    pub fn new(timeline_clip_ids: Vec<ClipId>, settings: RenderSettings) -> Self {
        Self {
            timeline_clip_ids,
            render_resolution: settings.resolution,
            render_quality: settings.quality,
        }
    }

    pub fn settings(&self) -> RenderSettings {
        RenderSettings::new(self.render_resolution, self.render_quality)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A single durable key-value slot for the snapshot.
#[async_trait]
pub trait SessionSlot: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn store(&self, value: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Slot backed by one file on disk.
pub struct FileSessionSlot {
    path: PathBuf,
}

impl FileSessionSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl SessionSlot for FileSessionSlot {
    async fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ReelcastError::Session(format!(
                "Failed to read session {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn store(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        // readers never see a half-written snapshot
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, value).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory slot.
#[derive(Default)]
pub struct MemorySessionSlot {
    value: Mutex<Option<String>>,
}

impl MemorySessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.value.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    fn set(&self, value: Option<String>) {
        *self.value.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = value;
    }
}

#[async_trait]
impl SessionSlot for MemorySessionSlot {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.get())
    }

    async fn store(&self, value: &str) -> Result<()> {
        self.set(Some(value.to_string()));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.set(None);
        Ok(())
    }
}

/// Outcome of [`restore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoredSession {
    pub clips: Vec<Clip>,
    pub settings: RenderSettings,
    /// Stored ids that no longer resolve to a clip.
    pub dropped: Vec<ClipId>,
}

/// Read the saved session once.
///
/// Ids that no longer resolve are dropped. A snapshot that cannot be
/// read or parsed is cleared and an empty session is returned; this
/// never fails.
pub async fn restore(slot: &dyn SessionSlot, store: &dyn ClipStore) -> RestoredSession {
    let raw = match slot.load().await {
        Ok(Some(raw)) => raw,
        Ok(None) => return RestoredSession::default(),
        Err(e) => {
            warn!(error = %e, "Failed to read saved session; starting empty");
            return RestoredSession::default();
        }
    };

    let snapshot = match SessionSnapshot::from_json(&raw) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "Discarding corrupt session snapshot");
            if let Err(e) = slot.clear().await {
                warn!(error = %e, "Failed to clear corrupt session snapshot");
            }
            return RestoredSession::default();
        }
    };

    let mut restored = RestoredSession {
        settings: snapshot.settings(),
        ..RestoredSession::default()
    };
    for id in snapshot.timeline_clip_ids {
        match store.get_clip(id).await {
            Ok(Some(clip)) => restored.clips.push(clip),
            Ok(None) => restored.dropped.push(id),
            Err(e) => {
                warn!(id = %id, error = %e, "Failed to look up saved clip");
                restored.dropped.push(id);
            }
        }
    }

    info!(
        clips = restored.clips.len(),
        dropped = restored.dropped.len(),
        "Session restored"
    );
    restored
}
