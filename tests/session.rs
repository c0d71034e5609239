mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{unsaved_clip, video_clip};
use reelcast::clip::ClipId;
use reelcast::config::SessionConfig;
use reelcast::error::{ReelcastError, Result};
use reelcast::session::{
    AutoSaver, EditingSession, FileSessionSlot, MemorySessionSlot, SaveStatus, SessionSlot, SessionSnapshot, restore,
};
use reelcast::store::{ClipStore, MemoryClipStore};
use reelcast::timeline::{QualityTier, RenderSettings, Resolution};

const DEBOUNCE: Duration = Duration::from_millis(3000);

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

fn snapshot(ids: &[u64]) -> SessionSnapshot {
    SessionSnapshot::new(ids.iter().copied().map(ClipId).collect(), RenderSettings::default())
}

#[tokio::test]
async fn test_restore_drops_missing_clips() {
    let store = MemoryClipStore::new();
    let first = store.save_new_clip(unsaved_clip("a.mp4", b"a")).await.unwrap();
    let second = store.save_new_clip(unsaved_clip("b.mp4", b"b")).await.unwrap();

    let slot = MemorySessionSlot::with_value(format!(
        r#"{{"timelineClipIds":[{},99,{}],"renderResolution":"1280x720","renderQuality":"High"}}"#,
        second, first
    ));
    let restored = restore(&slot, &store).await;

    let names: Vec<_> = restored.clips.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["b.mp4", "a.mp4"]);
    assert_eq!(restored.dropped, vec![ClipId(99)]);
    assert_eq!(
        restored.settings,
        RenderSettings::new(Resolution::Landscape720, QualityTier::High)
    );
    assert!(slot.get().is_some());
}

#[tokio::test]
async fn test_corrupt_snapshot_is_discarded() {
    let store = MemoryClipStore::new();
    let slot = MemorySessionSlot::with_value("{not json");

    let restored = restore(&slot, &store).await;
    assert!(restored.clips.is_empty());
    assert_eq!(restored.settings, RenderSettings::default());
    assert_eq!(slot.get(), None);
}

#[tokio::test]
async fn test_missing_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let slot = FileSessionSlot::new(dir.path().join("video-editor-session.json"));
    let restored = restore(&slot, &MemoryClipStore::new()).await;
    assert!(restored.clips.is_empty());
    assert!(restored.dropped.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_autosave_waits_for_quiet_period() {
    let slot = Arc::new(MemorySessionSlot::new());
    let saver = AutoSaver::spawn(slot.clone(), DEBOUNCE);

    saver.notify(snapshot(&[1]));
    settle().await;
    assert_eq!(saver.status(), SaveStatus::Pending);

    tokio::time::advance(Duration::from_millis(2999)).await;
    settle().await;
    assert_eq!(slot.get(), None);

    tokio::time::advance(Duration::from_millis(2)).await;
    settle().await;
    assert_eq!(saver.status(), SaveStatus::Saved);
    let saved = SessionSnapshot::from_json(&slot.get().unwrap()).unwrap();
    assert_eq!(saved, snapshot(&[1]));
}

#[tokio::test(start_paused = true)]
async fn test_autosave_restarts_on_every_change() {
    let slot = Arc::new(MemorySessionSlot::new());
    let saver = AutoSaver::spawn(slot.clone(), DEBOUNCE);

    saver.notify(snapshot(&[1]));
    settle().await;
    tokio::time::advance(Duration::from_millis(2000)).await;
    saver.notify(snapshot(&[1, 2]));
    settle().await;
    tokio::time::advance(Duration::from_millis(2000)).await;
    settle().await;
    assert_eq!(slot.get(), None, "first snapshot must not be written");

    tokio::time::advance(Duration::from_millis(1001)).await;
    settle().await;
    let saved = SessionSnapshot::from_json(&slot.get().unwrap()).unwrap();
    assert_eq!(saved.timeline_clip_ids, vec![ClipId(1), ClipId(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_flushes_pending_snapshot() {
    let slot = Arc::new(MemorySessionSlot::new());
    let saver = AutoSaver::spawn(slot.clone(), DEBOUNCE);

    saver.notify(snapshot(&[4, 2]));
    saver.shutdown().await;

    let saved = SessionSnapshot::from_json(&slot.get().unwrap()).unwrap();
    assert_eq!(saved.timeline_clip_ids, vec![ClipId(4), ClipId(2)]);
}

struct BrokenSlot;

#[async_trait]
impl SessionSlot for BrokenSlot {
    async fn load(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn store(&self, _value: &str) -> Result<()> {
        Err(ReelcastError::Session("read-only storage".to_string()))
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_save_is_reported() {
    let saver = AutoSaver::spawn(Arc::new(BrokenSlot), DEBOUNCE);
    saver.notify(snapshot(&[1]));
    saver.flush().await;

    assert!(matches!(saver.status(), SaveStatus::Failed(msg) if msg.contains("read-only")));
}

#[tokio::test(start_paused = true)]
async fn test_editor_notifies_only_on_saved_state_changes() {
    let slot = Arc::new(MemorySessionSlot::new());
    let mut session = EditingSession::new().with_autosaver(AutoSaver::spawn(slot.clone(), DEBOUNCE));

    session.append(video_clip(1, "a.mp4", b"a"));
    session.append(video_clip(2, "b.mp4", b"b"));
    session.autosaver().unwrap().flush().await;
    assert_eq!(
        SessionSnapshot::from_json(&slot.get().unwrap()).unwrap().timeline_clip_ids,
        vec![ClipId(1), ClipId(2)]
    );
    slot.clear().await.unwrap();

    // selection and trim are not part of the snapshot
    session.select(1, 8.0).unwrap();
    session.set_trim(1.0, 2.0).unwrap();
    session.set_quality(QualityTier::Medium);
    session.autosaver().unwrap().flush().await;
    assert_eq!(slot.get(), None);

    session.move_clip(1, 0).unwrap();
    session.set_resolution(Resolution::Landscape1080);
    let saver = session.take_autosaver().unwrap();
    saver.shutdown().await;

    let saved = SessionSnapshot::from_json(&slot.get().unwrap()).unwrap();
    assert_eq!(saved.timeline_clip_ids, vec![ClipId(2), ClipId(1)]);
    assert_eq!(saved.render_resolution, Resolution::Landscape1080);
}

#[tokio::test]
async fn test_restored_session_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".reelcast").join("video-editor-session.json");
    let store = MemoryClipStore::new();
    let id = store.save_new_clip(unsaved_clip("a.mp4", b"a")).await.unwrap();

    let slot: Arc<dyn SessionSlot> = Arc::new(FileSessionSlot::new(&path));
    let saver = AutoSaver::spawn(slot.clone(), DEBOUNCE);
    saver.notify(SessionSnapshot::new(
        vec![id],
        RenderSettings::new(Resolution::Portrait720, QualityTier::Low),
    ));
    saver.shutdown().await;

    let restored = restore(slot.as_ref(), &store).await;
    let session = EditingSession::from_restored(restored);
    assert_eq!(session.timeline().clip_ids(), vec![id]);
    assert_eq!(session.settings().quality, QualityTier::Low);
}

#[tokio::test]
async fn test_open_uses_configured_file_and_debounce() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig {
        path: dir.path().join("session.json"),
        autosave_debounce_ms: 20,
    };
    let store = MemoryClipStore::new();
    let id = store.save_new_clip(unsaved_clip("a.mp4", b"a")).await.unwrap();
    std::fs::write(&config.path, format!(r#"{{"timelineClipIds":[{},99]}}"#, id)).unwrap();

    let mut session = EditingSession::open(&config, &store).await;
    assert_eq!(session.timeline().clip_ids(), vec![id]);

    let mut status = session.autosaver().unwrap().subscribe();
    session.set_quality(QualityTier::High);
    tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| *s == SaveStatus::Saved))
        .await
        .unwrap()
        .unwrap();

    let saved = SessionSnapshot::from_json(&std::fs::read_to_string(&config.path).unwrap()).unwrap();
    assert_eq!(saved.timeline_clip_ids, vec![id]);
    assert_eq!(saved.render_quality, QualityTier::High);
    session.take_autosaver().unwrap().shutdown().await;
}
