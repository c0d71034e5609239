use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::clip::MediaKind;
use crate::timeline::{ExportHeight, QualityTier, Resolution};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Concatenate clips in the given order into one MP4
    Render {
        /// Input clips, in timeline order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output canvas (1280x720, 1920x1080, 720x1280, 1080x1920)
        #[arg(short, long, default_value = "1080x1920")]
        resolution: Resolution,

        /// Quality tier (low, medium, high)
        #[arg(short, long, default_value = "medium")]
        quality: QualityTier,

        /// Output MP4 file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Cut a clip between two timestamps without re-encoding
    Trim {
        /// Input clip
        #[arg(short, long)]
        input: PathBuf,

        /// Start time in seconds
        #[arg(short, long)]
        start: f64,

        /// End time in seconds
        #[arg(short, long)]
        end: f64,

        /// Output MP4 file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Apply a visual filter (brightness, contrast, sepia, grayscale, blur, sharpen)
    Filter {
        /// Input clip
        #[arg(short, long)]
        input: PathBuf,

        /// Filter name
        #[arg(short, long)]
        name: String,

        /// Filter value, where the filter takes one
        #[arg(long, allow_negative_numbers = true)]
        value: Option<f64>,

        /// Output MP4 file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Re-encode a clip into a 16:9 box of the given height
    Export {
        /// Input clip
        #[arg(short, long)]
        input: PathBuf,

        /// Target height (720p, 1080p)
        #[arg(long, default_value = "1080p")]
        height: ExportHeight,

        /// Output MP4 file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Split a clip into two parts at a timestamp
    Split {
        /// Input clip
        #[arg(short, long)]
        input: PathBuf,

        /// Split point in seconds
        #[arg(short, long)]
        at: f64,

        /// Directory for the two parts
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List media files in a directory
    Scan {
        /// Directory to scan
        dir: PathBuf,

        /// Media kind (image, video, audio)
        #[arg(short, long, default_value = "video")]
        kind: MediaKind,
    },

    /// Print the duration of a clip
    Probe {
        /// Input clip
        input: PathBuf,
    },
}
