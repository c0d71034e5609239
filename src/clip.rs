use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{ReelcastError, Result};

pub const MP4_MIME_TYPE: &str = "video/mp4";

/// Identifier assigned by the clip store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub u64);

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = ReelcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            _ => Err(ReelcastError::UnsupportedFormat(format!(
                "Unknown media kind '{}'. Valid kinds: image, video, audio",
                s
            ))),
        }
    }
}

/// Where the bytes of a clip live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ClipContent {
    /// Base64 payload, either bare or as a `data:<mime>;base64,` URL.
    Inline { data: String },
    /// Not yet read from disk; must be hydrated before processing.
    Local { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: Option<ClipId>,
    pub name: String,
    pub kind: MediaKind,
    pub mime_type: String,
    pub content: ClipContent,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

impl Clip {
    /// Unsaved clip holding inline bytes.
    pub fn from_bytes(name: impl Into<String>, kind: MediaKind, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind,
            mime_type: mime_type.into(),
            content: ClipContent::Inline {
                data: STANDARD.encode(bytes),
            },
            created_at: Utc::now(),
            tags: Vec::new(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.content, ClipContent::Local { .. })
    }

    pub fn local_path(&self) -> Option<&PathBuf> {
        match &self.content {
            ClipContent::Local { path } => Some(path),
            ClipContent::Inline { .. } => None,
        }
    }

    /// File extension taken from the display name, `mp4` when there is none.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_lowercase())
            .unwrap_or_else(|| "mp4".to_string())
    }

    /// Decode the playable bytes of this clip.
    ///
    /// Local clips have to be hydrated first, see [`crate::library::hydrate`].
    pub fn resolve_bytes(&self) -> Result<Vec<u8>> {
        match &self.content {
            ClipContent::Inline { data } => {
                let payload = strip_data_url(data);
                if payload.is_empty() {
                    return Err(ReelcastError::UnresolvedClip(self.name.clone()));
                }
                STANDARD
                    .decode(payload)
                    .map_err(|e| ReelcastError::UnresolvedClip(format!("{} ({})", self.name, e)))
            }
            ClipContent::Local { .. } => Err(ReelcastError::UnresolvedClip(self.name.clone())),
        }
    }
}

fn strip_data_url(data: &str) -> &str {
    if data.starts_with("data:") {
        match data.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => "",
        }
    } else {
        data
    }
}

/// A clip paired with its probed playback duration (0 when probing failed).
#[derive(Debug, Clone, PartialEq)]
pub struct ClipWithDuration {
    pub clip: Clip,
    pub duration: f64,
}

/// Output of one engine operation. Always an MP4 container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl MediaBlob {
    pub fn mp4(data: Vec<u8>) -> Self {
        Self {
            data,
            mime_type: MP4_MIME_TYPE.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}
