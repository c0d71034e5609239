use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::clip::{Clip, ClipContent, ClipId, MP4_MIME_TYPE, MediaBlob, MediaKind};
use crate::error::{ReelcastError, Result};
use crate::timeline::RenderSettings;

const GENERATED_PROMPT_CHARS: usize = 15;

/// Persistent clip storage consumed by the editor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClipStore: Send + Sync {
    async fn get_clip(&self, id: ClipId) -> Result<Option<Clip>>;

    /// Persist a clip without an id and return the id assigned to it.
    async fn save_new_clip(&self, clip: Clip) -> Result<ClipId>;
}

/// In-process store with sequential ids starting at 1.
#[derive(Default)]
pub struct MemoryClipStore {
    inner: Mutex<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    next_id: u64,
    clips: BTreeMap<ClipId, Clip>,
}

impl MemoryClipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delete_clip(&self, id: ClipId) -> bool {
        self.inner.lock().await.clips.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.clips.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ClipStore for MemoryClipStore {
    async fn get_clip(&self, id: ClipId) -> Result<Option<Clip>> {
        Ok(self.inner.lock().await.clips.get(&id).cloned())
    }

    async fn save_new_clip(&self, mut clip: Clip) -> Result<ClipId> {
        if clip.id.is_some() {
            return Err(ReelcastError::Store(format!(
                "Clip '{}' already has an id",
                clip.name
            )));
        }
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let id = ClipId(inner.next_id);
        clip.id = Some(id);
        inner.clips.insert(id, clip);
        Ok(id)
    }
}

/// `<base without extension>-<suffix>.mp4`
pub fn edited_clip_name(base_name: &str, suffix: &str) -> String {
    let stem = match base_name.rfind('.') {
        Some(dot) if dot > 0 && !base_name[dot + 1..].contains(['/', '\\']) => &base_name[..dot],
        _ => base_name,
    };
    format!("{}-{}.mp4", stem, suffix)
}

/// Suffix for a rendered timeline, e.g. `1280x720-medium`.
pub fn render_suffix(settings: RenderSettings) -> String {
    format!("{}-{}", settings.resolution, settings.quality.as_str().to_lowercase())
}

/// Persist an operation result as a brand-new clip and return it with its id.
///
/// Tagged `edited` plus the part of the suffix before its first `-`.
pub async fn save_edited_clip(
    store: &dyn ClipStore,
    blob: &MediaBlob,
    base_name: &str,
    suffix: &str,
) -> Result<Clip> {
    let operation_tag = suffix.split('-').next().unwrap_or(suffix).to_string();
    let clip = Clip {
        id: None,
        name: edited_clip_name(base_name, suffix),
        kind: MediaKind::Video,
        mime_type: MP4_MIME_TYPE.to_string(),
        content: ClipContent::Inline {
            data: blob.to_data_url(),
        },
        created_at: Utc::now(),
        tags: vec!["edited".to_string(), operation_tag],
    };
    persist(store, clip).await
}

/// Persist a timeline render as `timeline-render-<resolution>-<tier>.mp4`.
pub async fn save_rendered_timeline(
    store: &dyn ClipStore,
    blob: &MediaBlob,
    settings: RenderSettings,
) -> Result<Clip> {
    save_edited_clip(store, blob, "timeline-render", &render_suffix(settings)).await
}

/// Persist video returned by a generation service.
pub async fn save_generated_clip(store: &dyn ClipStore, blob: &MediaBlob, prompt: &str) -> Result<Clip> {
    let excerpt: String = prompt.chars().take(GENERATED_PROMPT_CHARS).collect();
    let clip = Clip {
        id: None,
        name: format!("generated-{}.mp4", excerpt),
        kind: MediaKind::Video,
        mime_type: MP4_MIME_TYPE.to_string(),
        content: ClipContent::Inline {
            data: blob.to_data_url(),
        },
        created_at: Utc::now(),
        tags: vec!["generated".to_string(), "ai-generated".to_string()],
    };
    persist(store, clip).await
}

async fn persist(store: &dyn ClipStore, mut clip: Clip) -> Result<Clip> {
    let id = store.save_new_clip(clip.clone()).await?;
    info!(id = %id, name = %clip.name, "Saved clip to library");
    clip.id = Some(id);
    Ok(clip)
}
