use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelcastError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid inline media payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Media engine failed to load: {0}")]
    EngineLoad(String),

    #[error("Media engine is not loaded; call ensure_ready first")]
    EngineNotReady,

    #[error("Media engine is busy with another operation")]
    EngineBusy,

    #[error("Media engine error: {0}")]
    Engine(String),

    #[error("Invalid range: start {start}s, end {end}s (clip duration {duration}s)")]
    InvalidRange { start: f64, end: f64, duration: f64 },

    #[error("Timeline is empty")]
    EmptyTimeline,

    #[error("Clip has no playable content: {0}")]
    UnresolvedClip(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Timeline composition failed: {0}")]
    Composition(String),

    #[error("Clip store error: {0}")]
    Store(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl ReelcastError {
    /// Collapse a failure that happened after staging into an `Encoding` error.
    ///
    /// Readiness and busy errors pass through untouched; they are raised
    /// before anything is staged.
    pub fn into_encoding(self) -> Self {
        match self {
            Self::Engine(msg) => Self::Encoding(msg),
            e @ (Self::Encoding(_)
            | Self::EngineBusy
            | Self::EngineNotReady
            | Self::EngineLoad(_)
            | Self::InvalidRange { .. }
            | Self::UnresolvedClip(_)) => e,
            other => Self::Encoding(other.to_string()),
        }
    }

    /// Same as [`into_encoding`](Self::into_encoding) for timeline renders.
    pub fn into_composition(self) -> Self {
        match self {
            Self::Engine(msg) | Self::Encoding(msg) => Self::Composition(msg),
            e @ (Self::Composition(_)
            | Self::EngineBusy
            | Self::EngineNotReady
            | Self::EngineLoad(_)
            | Self::EmptyTimeline
            | Self::UnresolvedClip(_)) => e,
            other => Self::Composition(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReelcastError>;
