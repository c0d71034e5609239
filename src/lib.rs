//! Reelcast - video timeline editing on top of ffmpeg
//!
//! Trims, filters, exports and splits single clips, and concatenates an
//! ordered timeline of clips into one H.264/AAC MP4 at a chosen canvas
//! size and quality tier. Editor sessions are persisted with a debounced
//! autosave.

pub mod cli;
pub mod clip;
pub mod config;
pub mod engine;
pub mod error;
pub mod library;
pub mod logging;
pub mod media;
pub mod session;
pub mod store;
pub mod timeline;
