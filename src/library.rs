//! Local filesystem bridge: discover media in a folder and hydrate deferred clips.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::clip::{Clip, ClipContent, MediaKind};
use crate::error::{ReelcastError, Result};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac"];

pub fn extensions_for(kind: MediaKind) -> &'static [&'static str] {
    match kind {
        MediaKind::Image => IMAGE_EXTENSIONS,
        MediaKind::Video => VIDEO_EXTENSIONS,
        MediaKind::Audio => AUDIO_EXTENSIONS,
    }
}

fn lower_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Media kind implied by a file's extension.
pub fn kind_for_path(path: &Path) -> Option<MediaKind> {
    let ext = lower_extension(path)?;
    [MediaKind::Video, MediaKind::Image, MediaKind::Audio]
        .into_iter()
        .find(|kind| extensions_for(*kind).contains(&ext.as_str()))
}

/// MIME type from the extension; `application/octet-stream` when unknown.
pub fn mime_type_for_path(path: &Path) -> String {
    let Some(ext) = lower_extension(path) else {
        return "application/octet-stream".to_string();
    };
    match (kind_for_path(path), ext.as_str()) {
        (Some(MediaKind::Image), "jpg") => "image/jpeg".to_string(),
        (Some(MediaKind::Audio), "mp3") => "audio/mpeg".to_string(),
        (Some(kind), ext) => format!("{}/{}", kind.as_str(), ext),
        (None, _) => "application/octet-stream".to_string(),
    }
}

/// Files directly inside `dir` whose extension matches `kind`, sorted by name.
pub fn scan_directory<P: AsRef<Path>>(dir: P, kind: MediaKind) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ReelcastError::FileNotFound(dir.display().to_string()));
    }

    let allowed = extensions_for(kind);
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(ext) = lower_extension(entry.path()) {
            if allowed.contains(&ext.as_str()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    info!(dir = %dir.display(), kind = kind.as_str(), found = files.len(), "Scanned media directory");
    Ok(files)
}

/// `data:<mime>;base64,<payload>` for the file at `path`.
pub async fn read_file_as_data_url<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let data = fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ReelcastError::FileNotFound(path.display().to_string()),
        _ => ReelcastError::Io(e),
    })?;
    Ok(format!(
        "data:{};base64,{}",
        mime_type_for_path(path),
        STANDARD.encode(data)
    ))
}

/// Deferred clip pointing at a file on disk.
pub fn local_clip<P: AsRef<Path>>(path: P, kind: MediaKind) -> Clip {
    let path = path.as_ref();
    Clip {
        id: None,
        name: path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string()),
        kind,
        mime_type: mime_type_for_path(path),
        content: ClipContent::Local {
            path: path.to_path_buf(),
        },
        created_at: Utc::now(),
        tags: vec!["local".to_string()],
    }
}

/// Inline the content of a local clip. Inline clips are returned unchanged.
pub async fn hydrate(clip: &Clip) -> Result<Clip> {
    let Some(path) = clip.local_path() else {
        return Ok(clip.clone());
    };
    let data = read_file_as_data_url(path).await.map_err(|e| {
        warn!(clip = %clip.name, error = %e, "Failed to hydrate local clip");
        ReelcastError::UnresolvedClip(format!("{} ({})", clip.name, e))
    })?;

    let mut hydrated = clip.clone();
    hydrated.content = ClipContent::Inline { data };
    Ok(hydrated)
}

/// Hydrate every clip, keeping order. Stops at the first failure.
pub async fn hydrate_all(clips: &[Clip]) -> Result<Vec<Clip>> {
    let mut hydrated = Vec::with_capacity(clips.len());
    for clip in clips {
        hydrated.push(hydrate(clip).await?);
    }
    Ok(hydrated)
}
