use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clip::{Clip, ClipId};
use crate::error::{ReelcastError, Result};

/// Target canvas of a timeline render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1280x720")]
    Landscape720,
    #[serde(rename = "1920x1080")]
    Landscape1080,
    #[serde(rename = "720x1280")]
    Portrait720,
    #[default]
    #[serde(rename = "1080x1920")]
    Portrait1080,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::Landscape720,
        Resolution::Landscape1080,
        Resolution::Portrait720,
        Resolution::Portrait1080,
    ];

    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Landscape720 => (1280, 720),
            Resolution::Landscape1080 => (1920, 1080),
            Resolution::Portrait720 => (720, 1280),
            Resolution::Portrait1080 => (1080, 1920),
        }
    }

    pub fn width(self) -> u32 {
        self.dimensions().0
    }

    pub fn height(self) -> u32 {
        self.dimensions().1
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{}x{}", w, h)
    }
}

impl FromStr for Resolution {
    type Err = ReelcastError;

    fn from_str(s: &str) -> Result<Self> {
        Resolution::ALL
            .into_iter()
            .find(|r| r.to_string() == s.trim())
            .ok_or_else(|| {
                ReelcastError::UnsupportedFormat(format!(
                    "Invalid resolution '{}'. Valid resolutions: 1280x720, 1920x1080, 720x1280, 1080x1920",
                    s
                ))
            })
    }
}

/// Named encoder quality. Lower constant means higher fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityTier {
    pub fn crf(self) -> u8 {
        tier_to_quality_constant(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Low => "Low",
            QualityTier::Medium => "Medium",
            QualityTier::High => "High",
        }
    }
}

/// Fixed mapping from tier to x264 CRF: Low 28, Medium 23, High 18.
pub fn tier_to_quality_constant(tier: QualityTier) -> u8 {
    match tier {
        QualityTier::Low => 28,
        QualityTier::Medium => 23,
        QualityTier::High => 18,
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = ReelcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            _ => Err(ReelcastError::UnsupportedFormat(format!(
                "Invalid quality '{}'. Valid tiers: low, medium, high",
                s
            ))),
        }
    }
}

/// Height preset for single-clip export; width assumes 16:9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExportHeight {
    #[serde(rename = "720p")]
    P720,
    #[default]
    #[serde(rename = "1080p")]
    P1080,
}

impl ExportHeight {
    pub fn height(self) -> u32 {
        match self {
            ExportHeight::P720 => 720,
            ExportHeight::P1080 => 1080,
        }
    }

    pub fn width(self) -> u32 {
        (self.height() as f64 * 16.0 / 9.0).round() as u32
    }
}

impl fmt::Display for ExportHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.height())
    }
}

impl FromStr for ExportHeight {
    type Err = ReelcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_end_matches('p') {
            "720" => Ok(ExportHeight::P720),
            "1080" => Ok(ExportHeight::P1080),
            _ => Err(ReelcastError::UnsupportedFormat(format!(
                "Invalid export height '{}'. Valid heights: 720p, 1080p",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderSettings {
    pub resolution: Resolution,
    pub quality: QualityTier,
}

impl RenderSettings {
    pub fn new(resolution: Resolution, quality: QualityTier) -> Self {
        Self { resolution, quality }
    }
}

/// Validated trim bounds in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimRange {
    pub start: f64,
    pub end: f64,
}

impl TrimRange {
    /// Whole-clip range, used when the selection changes.
    pub fn full(duration: f64) -> Self {
        Self {
            start: 0.0,
            end: duration.max(0.0),
        }
    }

    /// Check `0 <= start < end <= duration`.
    ///
    /// A duration of 0 means probing failed; only the lower bound and
    /// ordering are enforced then.
    pub fn checked(start: f64, end: f64, duration: f64) -> Result<Self> {
        let ordered = start.is_finite() && end.is_finite() && start >= 0.0 && start < end;
        let within = duration <= 0.0 || end <= duration;
        if ordered && within {
            Ok(Self { start, end })
        } else {
            Err(ReelcastError::InvalidRange { start, end, duration })
        }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// Ordered clips; order is concatenation order. Duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    clips: Vec<Clip>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clips(clips: Vec<Clip>) -> Self {
        Self { clips }
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index)
    }

    pub fn append(&mut self, clip: Clip) {
        self.clips.push(clip);
    }

    pub fn extend(&mut self, clips: impl IntoIterator<Item = Clip>) {
        self.clips.extend(clips);
    }

    /// Move the clip at `from` to `to`, shifting the clips in between.
    pub fn move_clip(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.clips.len();
        if from >= len || to >= len {
            return Err(ReelcastError::Session(format!(
                "Cannot move clip {} to {} in a timeline of {} clips",
                from, to, len
            )));
        }
        let clip = self.clips.remove(from);
        self.clips.insert(to, clip);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<Clip> {
        (index < self.clips.len()).then(|| self.clips.remove(index))
    }

    /// Swap in an edited clip, returning the one it replaced.
    pub fn replace(&mut self, index: usize, clip: Clip) -> Option<Clip> {
        self.clips
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, clip))
    }

    /// Ids of the persisted clips, in order. Unsaved clips are skipped.
    pub fn clip_ids(&self) -> Vec<ClipId> {
        self.clips.iter().filter_map(|clip| clip.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::MediaKind;

    fn named(name: &str) -> Clip {
        let mut clip = Clip::from_bytes(name, MediaKind::Video, "video/mp4", b"x");
        clip.id = name.strip_prefix("clip").and_then(|n| n.parse().ok()).map(ClipId);
        clip
    }

    fn names(timeline: &Timeline) -> Vec<&str> {
        timeline.clips().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_quality_constants() {
        assert_eq!(tier_to_quality_constant(QualityTier::Low), 28);
        assert_eq!(tier_to_quality_constant(QualityTier::Medium), 23);
        assert_eq!(tier_to_quality_constant(QualityTier::High), 18);
    }

    #[test]
    fn test_resolution_round_trips_through_strings() {
        for resolution in Resolution::ALL {
            assert_eq!(resolution.to_string().parse::<Resolution>().unwrap(), resolution);
        }
        assert_eq!(Resolution::Portrait720.dimensions(), (720, 1280));
        assert!("640x480".parse::<Resolution>().is_err());
        assert_eq!(
            serde_json::to_string(&Resolution::Landscape720).unwrap(),
            "\"1280x720\""
        );
    }

    #[test]
    fn test_export_width_assumes_sixteen_by_nine() {
        assert_eq!(ExportHeight::P720.width(), 1280);
        assert_eq!(ExportHeight::P1080.width(), 1920);
        assert_eq!("720p".parse::<ExportHeight>().unwrap(), ExportHeight::P720);
    }

    #[test]
    fn test_trim_range_validation() {
        assert!(TrimRange::checked(1.0, 3.5, 4.0).is_ok());
        assert!(TrimRange::checked(0.0, 4.0, 4.0).is_ok());
        assert!(matches!(
            TrimRange::checked(5.0, 2.0, 10.0),
            Err(ReelcastError::InvalidRange { .. })
        ));
        assert!(TrimRange::checked(2.0, 2.0, 10.0).is_err());
        assert!(TrimRange::checked(-1.0, 2.0, 10.0).is_err());
        assert!(TrimRange::checked(1.0, 11.0, 10.0).is_err());
        assert!(TrimRange::checked(1.0, f64::NAN, 10.0).is_err());
        // unknown duration
        assert!(TrimRange::checked(1.0, 11.0, 0.0).is_ok());
    }

    #[test]
    fn test_move_clip_shifts_neighbours() {
        let mut timeline = Timeline::from_clips(vec![named("a"), named("b"), named("c"), named("d")]);
        timeline.move_clip(0, 2).unwrap();
        assert_eq!(names(&timeline), ["b", "c", "a", "d"]);
        timeline.move_clip(3, 0).unwrap();
        assert_eq!(names(&timeline), ["d", "b", "c", "a"]);
        assert!(timeline.move_clip(4, 0).is_err());
    }

    #[test]
    fn test_clip_ids_keep_order_and_duplicates() {
        let mut timeline = Timeline::new();
        timeline.extend([named("clip7"), named("unsaved"), named("clip3"), named("clip7")]);
        assert_eq!(timeline.clip_ids(), vec![ClipId(7), ClipId(3), ClipId(7)]);

        let removed = timeline.remove(1).unwrap();
        assert_eq!(removed.name, "unsaved");
        assert!(timeline.remove(9).is_none());

        let old = timeline.replace(0, named("clip9")).unwrap();
        assert_eq!(old.id, Some(ClipId(7)));
        assert_eq!(timeline.clip_ids(), vec![ClipId(9), ClipId(3), ClipId(7)]);
    }
}
