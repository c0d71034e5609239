//! Abstract filter descriptors and their ffmpeg filter-graph expressions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ReelcastError, Result};

const SEPIA_MATRIX: &str = "colorchannelmixer=.393:.769:.189:0:.349:.686:.168:0:.272:.534:.131";
const SHARPEN_KERNEL: &str = "unsharp=5:5:1.0:5:5:0.0";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "value", rename_all = "lowercase")]
pub enum VideoFilter {
    /// -1.0..=1.0, 0 leaves the picture unchanged
    Brightness(f64),
    /// -2.0..=2.0, 1 leaves the picture unchanged
    Contrast(f64),
    Sepia,
    Grayscale,
    /// Gaussian sigma
    Blur(u32),
    Sharpen,
}

impl VideoFilter {
    /// Build a descriptor from a filter name and an optional numeric value.
    pub fn parse(name: &str, value: Option<f64>) -> Result<Self> {
        let need = |default: f64| value.unwrap_or(default);
        match name.trim().to_lowercase().as_str() {
            "brightness" => Ok(VideoFilter::Brightness(need(0.0))),
            "contrast" => Ok(VideoFilter::Contrast(need(1.0))),
            "sepia" => Ok(VideoFilter::Sepia),
            "grayscale" | "greyscale" | "bw" => Ok(VideoFilter::Grayscale),
            "blur" => {
                let sigma = need(0.0);
                if !sigma.is_finite() || sigma < 0.0 {
                    return Err(ReelcastError::UnsupportedFormat(format!(
                        "Blur sigma must be a non-negative number, got {}",
                        sigma
                    )));
                }
                Ok(VideoFilter::Blur(sigma.round() as u32))
            }
            "sharpen" => Ok(VideoFilter::Sharpen),
            _ => Err(ReelcastError::UnsupportedFormat(format!(
                "Unknown filter '{}'. Valid filters: brightness, contrast, sepia, grayscale, blur, sharpen",
                name
            ))),
        }
    }

    /// Lower-case tag, used when naming the saved result.
    pub fn name(&self) -> &'static str {
        match self {
            VideoFilter::Brightness(_) => "brightness",
            VideoFilter::Contrast(_) => "contrast",
            VideoFilter::Sepia => "sepia",
            VideoFilter::Grayscale => "grayscale",
            VideoFilter::Blur(_) => "blur",
            VideoFilter::Sharpen => "sharpen",
        }
    }

    /// The filter-graph expression for this descriptor.
    pub fn to_expression(&self) -> String {
        match *self {
            VideoFilter::Brightness(v) => format!("eq=brightness={}", clamp_finite(v, -1.0, 1.0, 0.0)),
            VideoFilter::Contrast(v) => format!("eq=contrast={}", clamp_finite(v, -2.0, 2.0, 1.0)),
            VideoFilter::Sepia => SEPIA_MATRIX.to_string(),
            VideoFilter::Grayscale => "format=gray,format=yuv420p".to_string(),
            VideoFilter::Blur(sigma) => format!("gblur=sigma={}", sigma),
            VideoFilter::Sharpen => SHARPEN_KERNEL.to_string(),
        }
    }
}

impl fmt::Display for VideoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_expression())
    }
}

fn clamp_finite(v: f64, min: f64, max: f64, neutral: f64) -> f64 {
    if v.is_finite() { v.clamp(min, max) } else { neutral }
}

/// Shrink to fit inside `width`x`height`, pad with black, normalize to yuv420p.
pub fn fit_box_filter(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:-1:-1:color=black,format=yuv420p",
        w = width,
        h = height
    )
}
