mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{FakeEngine, ProgressLog, ready_binding, video_clip};
use reelcast::clip::{ClipContent, ClipId};
use reelcast::engine::{EngineBinding, no_progress};
use reelcast::error::ReelcastError;
use reelcast::media::{ConcatManifest, MediaCommandBuilder, TimelineCompositor};
use reelcast::store::{ClipStore, MemoryClipStore, save_rendered_timeline};
use reelcast::timeline::{QualityTier, RenderSettings, Resolution};

fn compositor(binding: Arc<EngineBinding>) -> TimelineCompositor {
    TimelineCompositor::new(binding, MediaCommandBuilder::default())
}

fn landscape_medium() -> RenderSettings {
    RenderSettings::new(Resolution::Landscape720, QualityTier::Medium)
}

#[tokio::test]
async fn test_render_two_clips_in_timeline_order() {
    let engine = FakeEngine::new();
    engine.set_duration(b"clip-a", 4.0);
    engine.set_duration(b"clip-b", 6.0);
    let binding = ready_binding(&engine).await;

    let clips = vec![video_clip(1, "a.mp4", b"clip-a"), video_clip(2, "b.mov", b"clip-b")];
    let blob = compositor(binding)
        .render(&clips, landscape_medium(), &no_progress)
        .await
        .unwrap();

    assert_eq!(blob.mime_type, "video/mp4");
    assert_eq!(blob.data, b"clip-a|clip-b");

    let manifests = engine.manifests();
    assert_eq!(manifests.len(), 1);
    let entries = ConcatManifest::parse_script(&manifests[0]);
    assert_eq!(entries.len(), 2);
    assert!(entries[0].ends_with("-input0.mp4"));
    assert!(entries[1].ends_with("-input1.mov"));
    assert_eq!(&engine.writes()[..2], entries.as_slice());

    let commands = engine.commands();
    assert_eq!(commands.len(), 1);
    let render = &commands[0];
    assert_eq!(render.value_of("-crf"), Some("23"));
    assert_eq!(render.value_of("-f"), Some("concat"));
    assert_eq!(render.value_of("-c:v"), Some("libx264"));
    assert_eq!(render.value_of("-c:a"), Some("aac"));
    assert_eq!(render.value_of("-movflags"), Some("+faststart"));
    let vf = render.value_of("-vf").unwrap();
    assert!(vf.starts_with("scale=1280:720:force_original_aspect_ratio=decrease"));
    assert!(vf.contains("pad=1280:720"));
    assert_eq!(render.expected_duration, Some(10.0));

    assert!(engine.files().is_empty(), "scratch entries left behind");
}

#[tokio::test]
async fn test_empty_timeline_never_touches_engine() {
    let engine = FakeEngine::new();
    let binding = ready_binding(&engine).await;

    let err = compositor(binding)
        .render(&[], landscape_medium(), &no_progress)
        .await
        .unwrap_err();

    assert!(matches!(err, ReelcastError::EmptyTimeline));
    assert!(engine.writes().is_empty());
    assert!(engine.commands().is_empty());
}

#[tokio::test]
async fn test_unresolved_clip_is_rejected_before_staging() {
    let engine = FakeEngine::new();
    let binding = ready_binding(&engine).await;

    let mut deferred = video_clip(2, "far-away.mp4", b"");
    deferred.content = ClipContent::Local {
        path: PathBuf::from("/media/far-away.mp4"),
    };
    let clips = vec![video_clip(1, "a.mp4", b"clip-a"), deferred];

    let err = compositor(binding)
        .render(&clips, landscape_medium(), &no_progress)
        .await
        .unwrap_err();

    assert!(matches!(err, ReelcastError::UnresolvedClip(name) if name == "far-away.mp4"));
    assert!(engine.writes().is_empty());
}

#[tokio::test]
async fn test_encode_failure_cleans_up_inputs_and_partial_output() {
    let engine = FakeEngine::new();
    engine.fail_exec("Conversion failed!");
    let binding = ready_binding(&engine).await;

    let clips = vec![video_clip(1, "a.mp4", b"clip-a"), video_clip(2, "b.mp4", b"clip-b")];
    let err = compositor(binding)
        .render(&clips, landscape_medium(), &no_progress)
        .await
        .unwrap_err();

    assert!(matches!(err, ReelcastError::Composition(msg) if msg.contains("Conversion failed!")));
    assert!(engine.files().is_empty(), "scratch entries left behind");
    // two inputs, the manifest and the output
    assert_eq!(engine.deletes().len(), 4);
}

#[tokio::test]
async fn test_staging_failure_aborts_with_cleanup() {
    let engine = FakeEngine::new();
    engine.fail_write_at(1);
    let binding = ready_binding(&engine).await;

    let clips = vec![
        video_clip(1, "a.mp4", b"clip-a"),
        video_clip(2, "b.mp4", b"clip-b"),
        video_clip(3, "c.mp4", b"clip-c"),
    ];
    let err = compositor(binding)
        .render(&clips, landscape_medium(), &no_progress)
        .await
        .unwrap_err();

    assert!(matches!(err, ReelcastError::Composition(_)));
    assert!(engine.commands().is_empty());
    assert!(engine.files().is_empty());
    assert_eq!(engine.deletes(), engine.writes());
}

#[tokio::test]
async fn test_order_survives_digit_boundary() {
    let engine = FakeEngine::new();
    let binding = ready_binding(&engine).await;

    let clips: Vec<_> = (0..12)
        .map(|i| video_clip(i + 1, &format!("clip{}.mp4", i), format!("c{}", i).as_bytes()))
        .collect();
    let blob = compositor(binding)
        .render(&clips, RenderSettings::default(), &no_progress)
        .await
        .unwrap();

    let expected: Vec<String> = (0..12).map(|i| format!("c{}", i)).collect();
    assert_eq!(String::from_utf8(blob.data).unwrap(), expected.join("|"));

    let entries = ConcatManifest::parse_script(&engine.manifests()[0]);
    assert!(entries[10].ends_with("-input10.mp4"));
    assert_eq!(&engine.writes()[..12], entries.as_slice());

    let render = &engine.commands()[0];
    assert_eq!(render.value_of("-crf"), Some("23"));
    assert!(render.value_of("-vf").unwrap().contains("pad=1080:1920"));
    // no durations known
    assert_eq!(render.expected_duration, None);
}

#[tokio::test]
async fn test_render_progress_is_monotonic() {
    let engine = FakeEngine::new();
    engine.set_progress_steps(&[0.1, 0.6, 0.3, 0.6, 2.0]);
    let binding = ready_binding(&engine).await;

    let log = ProgressLog::default();
    let on_progress = |percent: u8| log.record(percent);
    compositor(binding)
        .render(&[video_clip(1, "a.mp4", b"a")], landscape_medium(), &on_progress)
        .await
        .unwrap();

    assert_eq!(log.values(), vec![0, 10, 60, 100]);
}

#[tokio::test]
async fn test_render_before_load_is_rejected() {
    let engine = FakeEngine::new();
    let binding = Arc::new(EngineBinding::new(engine.clone()));

    let err = compositor(binding)
        .render(&[video_clip(1, "a.mp4", b"a")], landscape_medium(), &no_progress)
        .await
        .unwrap_err();

    assert!(matches!(err, ReelcastError::EngineNotReady));
    assert!(engine.writes().is_empty());
}

#[tokio::test]
async fn test_rendered_timeline_is_saved_as_new_clip() {
    let engine = FakeEngine::new();
    let binding = ready_binding(&engine).await;
    let store = MemoryClipStore::new();

    let settings = RenderSettings::new(Resolution::Portrait720, QualityTier::Low);
    let blob = compositor(binding)
        .render(&[video_clip(1, "a.mp4", b"a")], settings, &no_progress)
        .await
        .unwrap();
    let saved = save_rendered_timeline(&store, &blob, settings).await.unwrap();

    assert_eq!(saved.id, Some(ClipId(1)));
    assert_eq!(saved.name, "timeline-render-720x1280-low.mp4");
    let stored = store.get_clip(ClipId(1)).await.unwrap().unwrap();
    assert_eq!(stored.resolve_bytes().unwrap(), b"a");
}
