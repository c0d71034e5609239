use std::sync::Arc;
use tracing::info;

use crate::clip::{Clip, ClipId};
use crate::config::SessionConfig;
use crate::error::{ReelcastError, Result};
use crate::store::ClipStore;
use crate::timeline::{QualityTier, RenderSettings, Resolution, Timeline, TrimRange};

use super::{AutoSaver, FileSessionSlot, RestoredSession, SessionSlot, SessionSnapshot, restore};

/// The selected timeline clip and its trim bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub duration: f64,
    pub trim: TrimRange,
}

/// Editor state: timeline, render settings and the current selection.
///
/// Every mutation that changes the clip-id sequence or the render settings
/// is forwarded to the attached [`AutoSaver`].
#[derive(Default)]
pub struct EditingSession {
    timeline: Timeline,
    settings: RenderSettings,
    selection: Option<Selection>,
    saver: Option<AutoSaver>,
}

impl EditingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_restored(restored: RestoredSession) -> Self {
        Self {
            timeline: Timeline::from_clips(restored.clips),
            settings: restored.settings,
            selection: None,
            saver: None,
        }
    }

    /// Restore the session saved at `config.path` and autosave further
    /// changes there after `config.autosave_debounce_ms` of quiet.
    pub async fn open(config: &SessionConfig, store: &dyn ClipStore) -> Self {
        let slot: Arc<dyn SessionSlot> = Arc::new(FileSessionSlot::new(&config.path));
        let restored = restore(slot.as_ref(), store).await;
        info!(
            path = %config.path.display(),
            debounce_ms = config.autosave_debounce_ms,
            "Opened editing session"
        );
        Self::from_restored(restored).with_autosaver(AutoSaver::spawn(slot, config.autosave_debounce()))
    }

    pub fn with_autosaver(mut self, saver: AutoSaver) -> Self {
        self.saver = Some(saver);
        self
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn settings(&self) -> RenderSettings {
        self.settings
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn selected_clip(&self) -> Option<&Clip> {
        self.selection.and_then(|s| self.timeline.get(s.index))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(self.timeline.clip_ids(), self.settings)
    }

    pub fn autosaver(&self) -> Option<&AutoSaver> {
        self.saver.as_ref()
    }

    /// Detach the autosaver, e.g. to shut it down on exit.
    pub fn take_autosaver(&mut self) -> Option<AutoSaver> {
        self.saver.take()
    }

    pub fn append(&mut self, clip: Clip) {
        self.tracked(|session| session.timeline.append(clip))
    }

    pub fn extend(&mut self, clips: impl IntoIterator<Item = Clip>) {
        let clips: Vec<Clip> = clips.into_iter().collect();
        self.tracked(|session| session.timeline.extend(clips))
    }

    pub fn move_clip(&mut self, from: usize, to: usize) -> Result<()> {
        self.tracked(|session| {
            session.timeline.move_clip(from, to)?;
            session.selection = session.selection.map(|mut s| {
                s.index = moved_index(s.index, from, to);
                s
            });
            Ok(())
        })
    }

    pub fn remove(&mut self, index: usize) -> Option<Clip> {
        self.tracked(|session| {
            let removed = session.timeline.remove(index);
            if removed.is_some() {
                session.selection = match session.selection {
                    Some(s) if s.index == index => None,
                    Some(mut s) if s.index > index => {
                        s.index -= 1;
                        Some(s)
                    }
                    other => other,
                };
            }
            removed
        })
    }

    /// Swap in an edited clip at `index`. Selecting it again resets the trim.
    pub fn replace(&mut self, index: usize, clip: Clip, duration: f64) -> Option<Clip> {
        self.tracked(|session| {
            let replaced = session.timeline.replace(index, clip);
            if replaced.is_some() && session.selection.is_some_and(|s| s.index == index) {
                session.selection = Some(Selection {
                    index,
                    duration,
                    trim: TrimRange::full(duration),
                });
            }
            replaced
        })
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.tracked(|session| session.settings.resolution = resolution)
    }

    pub fn set_quality(&mut self, quality: QualityTier) {
        self.tracked(|session| session.settings.quality = quality)
    }

    /// Select a clip; the trim range resets to the whole clip.
    pub fn select(&mut self, index: usize, duration: f64) -> Result<()> {
        if index >= self.timeline.len() {
            return Err(ReelcastError::Session(format!(
                "No clip at index {} in a timeline of {} clips",
                index,
                self.timeline.len()
            )));
        }
        self.selection = Some(Selection {
            index,
            duration,
            trim: TrimRange::full(duration),
        });
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Set the trim bounds of the selected clip.
    pub fn set_trim(&mut self, start: f64, end: f64) -> Result<TrimRange> {
        let selection = self
            .selection
            .as_mut()
            .ok_or_else(|| ReelcastError::Session("No clip selected".to_string()))?;
        let trim = TrimRange::checked(start, end, selection.duration)?;
        selection.trim = trim;
        Ok(trim)
    }

    /// Run a mutation and notify the autosaver if the saved state changed.
    fn tracked<T>(&mut self, mutate: impl FnOnce(&mut Self) -> T) -> T {
        let before_ids: Vec<ClipId> = self.timeline.clip_ids();
        let before_settings = self.settings;

        let outcome = mutate(self);

        if self.timeline.clip_ids() != before_ids || self.settings != before_settings {
            if let Some(saver) = &self.saver {
                saver.notify(self.snapshot());
            }
        }
        outcome
    }
}

fn moved_index(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < index && index <= to {
        index - 1
    } else if to <= index && index < from {
        index + 1
    } else {
        index
    }
}
