//! End-to-end engine tests: commands, OS media actions, background recovery
//! and prefetching driven through the engine loop.

mod common;

use bridge_traits::{LifecycleState, MediaAction, MediaActionKind, SessionPlaybackState};
use common::{
    settle, tracks, wait_for, FakeMediaElement, ManualLifecycle, MediaCall, RecordingHistory,
    RecordingSession, ScriptedResolver,
};
use core_playback::{
    EngineHandle, PlaybackConfig, PlaybackEngine, PlaybackError, PlaybackStatus,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, RecoveryEvent};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    engine: EngineHandle,
    media: Arc<FakeMediaElement>,
    backend: Arc<ScriptedResolver>,
    session: Arc<RecordingSession>,
}

async fn start() -> Fixture {
    let media = Arc::new(FakeMediaElement::new());
    let backend = Arc::new(ScriptedResolver::new());
    let session = Arc::new(RecordingSession::new());

    let core = CoreConfig::builder()
        .media_element(media.clone())
        .stream_resolver(backend.clone())
        .media_session(session.clone())
        .build()
        .unwrap();
    let engine = PlaybackEngine::start(core, PlaybackConfig::default())
        .await
        .unwrap();

    Fixture {
        engine,
        media,
        backend,
        session,
    }
}

/// Start with a three-track queue and wait until the first track plays.
async fn start_playing() -> Fixture {
    let fixture = start().await;
    fixture
        .engine
        .replace_queue(tracks(&["a", "b", "c"]))
        .unwrap();
    let mut state = fixture.engine.subscribe();
    wait_for(&mut state, |s| s.status == PlaybackStatus::Playing).await;
    fixture
}

#[tokio::test(start_paused = true)]
async fn test_track_end_moves_through_queue() {
    let f = start_playing().await;
    let mut state = f.engine.subscribe();

    f.engine.track_ended(f.engine.snapshot().generation).unwrap();
    let snapshot = wait_for(&mut state, |s| {
        s.status == PlaybackStatus::Playing && s.current_index == Some(1)
    })
    .await;

    assert_eq!(snapshot.current_track.unwrap().id.as_str(), "b");
    assert_eq!(snapshot.active_url, Some(ScriptedResolver::url_for("b")));
}

#[tokio::test(start_paused = true)]
async fn test_media_events_for_previous_track_are_ignored() {
    let f = start_playing().await;
    let mut state = f.engine.subscribe();
    let generation_a = f.engine.snapshot().generation;

    f.engine.skip_next().unwrap();
    wait_for(&mut state, |s| {
        s.status == PlaybackStatus::Playing && s.current_index == Some(1)
    })
    .await;

    f.engine.track_ended(generation_a).unwrap();
    f.engine.media_failed(generation_a, "decode error").unwrap();
    settle().await;

    let snapshot = f.engine.snapshot();
    assert_eq!(snapshot.status, PlaybackStatus::Playing);
    assert_eq!(snapshot.current_index, Some(1));
    assert_eq!(snapshot.active_url, Some(ScriptedResolver::url_for("b")));

    f.engine
        .media_failed(snapshot.generation, "decode error")
        .unwrap();
    let snapshot = wait_for(&mut state, |s| s.status == PlaybackStatus::Error).await;
    assert_eq!(snapshot.current_index, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_os_pause_action_pauses_without_moving() {
    let f = start_playing().await;
    let mut state = f.engine.subscribe();
    assert_eq!(f.session.registered(), MediaActionKind::ALL.to_vec());

    let before = f.engine.resolver_stats().await.unwrap();
    f.session.trigger(MediaAction::Pause);

    let snapshot = wait_for(&mut state, |s| s.status == PlaybackStatus::Paused).await;
    assert_eq!(snapshot.current_index, Some(0));

    let after = f.engine.resolver_stats().await.unwrap();
    assert_eq!(after.cache.entries, before.cache.entries);
    assert_eq!(after.backend_requests, before.backend_requests);

    settle().await;
    let states = f.session.states.lock().unwrap().clone();
    assert_eq!(states.last(), Some(&SessionPlaybackState::Paused));
    assert!(states.contains(&SessionPlaybackState::Playing));
}

#[tokio::test(start_paused = true)]
async fn test_os_next_and_seek_actions() {
    let f = start_playing().await;
    let mut state = f.engine.subscribe();

    f.media
        .set_timeline(Duration::from_secs(20), Some(Duration::from_secs(180)));
    f.session.trigger(MediaAction::SeekForward(None));
    settle().await;
    assert!(f
        .media
        .calls()
        .contains(&MediaCall::Seek(Duration::from_secs(30))));

    f.session.trigger(MediaAction::NextTrack);
    wait_for(&mut state, |s| {
        s.status == PlaybackStatus::Playing && s.current_index == Some(1)
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_control_surface_mirrors_metadata_and_position() {
    let f = start_playing().await;

    f.media
        .set_timeline(Duration::from_secs(30), Some(Duration::from_secs(180)));
    tokio::time::sleep(Duration::from_secs(3)).await;

    let metadata = f.session.metadata.lock().unwrap().clone();
    let last = metadata.last().unwrap();
    assert_eq!(last.title, "Song a");
    assert_eq!(last.album.as_deref(), Some("TuneBox"));

    let positions = f.session.positions.lock().unwrap().clone();
    assert!(!positions.is_empty());
    let last = positions.last().unwrap();
    assert_eq!(last.duration, Duration::from_secs(180));
    assert_eq!(last.position, Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_foreground_resumes_paused_media() {
    let f = start_playing().await;
    let mut events = f.engine.event_stream();

    f.engine
        .lifecycle_changed(LifecycleState::Background)
        .unwrap();
    f.media.force_pause();
    let plays_before = f.media.play_count();

    f.engine
        .lifecycle_changed(LifecycleState::Foreground)
        .unwrap();
    settle().await;

    assert_eq!(f.media.play_count(), plays_before + 1);
    assert_eq!(f.engine.snapshot().status, PlaybackStatus::Playing);
    assert!(f.engine.snapshot().foreground);

    let mut resumed = false;
    while let Some(Ok(event)) = events.try_recv() {
        resumed |= event == CoreEvent::Recovery(RecoveryEvent::Resumed { attempts: 1 });
    }
    assert!(resumed);
}

#[tokio::test(start_paused = true)]
async fn test_resume_gives_up_after_max_attempts() {
    let f = start_playing().await;
    let mut state = f.engine.subscribe();

    f.engine.set_foreground(false).unwrap();
    f.media.force_pause();
    f.media.set_stuck(true);
    let plays_before = f.media.play_count();

    f.engine.set_foreground(true).unwrap();
    let snapshot = wait_for(&mut state, |s| s.status == PlaybackStatus::Error).await;

    assert_eq!(f.media.play_count(), plays_before + 3);
    assert!(snapshot.error_message.unwrap().contains("3 attempts"));

    // No further attempts once exhausted.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(f.media.play_count(), plays_before + 3);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_abandoned_when_user_pauses() {
    let f = start_playing().await;

    f.engine.set_foreground(false).unwrap();
    f.media.force_pause();
    f.media.set_stuck(true);
    let plays_before = f.media.play_count();

    f.engine.set_foreground(true).unwrap();
    f.engine.pause().unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(f.media.play_count(), plays_before + 1);
    assert_eq!(f.engine.snapshot().status, PlaybackStatus::Paused);
}

#[tokio::test(start_paused = true)]
async fn test_missed_track_end_advances() {
    let f = start_playing().await;
    let mut state = f.engine.subscribe();

    f.engine.set_foreground(false).unwrap();
    f.media.set_ended(true);
    f.engine.set_foreground(true).unwrap();

    wait_for(&mut state, |s| {
        s.status == PlaybackStatus::Playing && s.current_index == Some(1)
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_observer_drives_recovery() {
    let media = Arc::new(FakeMediaElement::new());
    let backend = Arc::new(ScriptedResolver::new());
    let lifecycle = Arc::new(ManualLifecycle::new(LifecycleState::Foreground));

    let core = CoreConfig::builder()
        .media_element(media.clone())
        .stream_resolver(backend)
        .lifecycle_observer(lifecycle.clone())
        .build()
        .unwrap();
    let engine = PlaybackEngine::start(core, PlaybackConfig::default())
        .await
        .unwrap();
    let mut state = engine.subscribe();

    engine.replace_queue(tracks(&["a"])).unwrap();
    wait_for(&mut state, |s| s.status == PlaybackStatus::Playing).await;

    lifecycle.set(LifecycleState::Background);
    wait_for(&mut state, |s| !s.foreground).await;

    media.force_pause();
    let plays_before = media.play_count();
    lifecycle.set(LifecycleState::Foreground);
    wait_for(&mut state, |s| s.foreground).await;
    settle().await;

    assert_eq!(media.play_count(), plays_before + 1);
    assert_eq!(engine.snapshot().status, PlaybackStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_change_during_startup_is_not_lost() {
    let media = Arc::new(FakeMediaElement::new());
    let lifecycle = Arc::new(ManualLifecycle::new(LifecycleState::Foreground));
    lifecycle.change_after_read(LifecycleState::Background);

    let core = CoreConfig::builder()
        .media_element(media)
        .stream_resolver(Arc::new(ScriptedResolver::new()))
        .lifecycle_observer(lifecycle)
        .build()
        .unwrap();
    let engine = PlaybackEngine::start(core, PlaybackConfig::default())
        .await
        .unwrap();
    let mut state = engine.subscribe();

    wait_for(&mut state, |s| !s.foreground).await;
}

#[tokio::test(start_paused = true)]
async fn test_prefetch_happens_once_per_track() {
    let f = start_playing().await;

    f.media
        .set_timeline(Duration::from_secs(90), Some(Duration::from_secs(100)));
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(f.backend.call_count("b"), 1);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(f.backend.call_count("b"), 1);

    let stats = f.engine.resolver_stats().await.unwrap();
    assert_eq!(stats.cache.entries, 2);
}

#[tokio::test(start_paused = true)]
async fn test_history_recorded_through_engine() -> anyhow::Result<()> {
    let media = Arc::new(FakeMediaElement::new());
    let history = Arc::new(RecordingHistory::new());

    let core = CoreConfig::builder()
        .media_element(media)
        .stream_resolver(Arc::new(ScriptedResolver::new()))
        .history_sink(history.clone())
        .build()?;
    let engine = PlaybackEngine::start(core, PlaybackConfig::default()).await?;
    let mut state = engine.subscribe();

    engine.replace_queue(tracks(&["a", "b"]))?;
    wait_for(&mut state, |s| s.status == PlaybackStatus::Playing).await;
    engine.skip_next()?;
    wait_for(&mut state, |s| {
        s.status == PlaybackStatus::Playing && s.current_index == Some(1)
    })
    .await;
    settle().await;

    let ids: Vec<String> = history
        .entries()
        .into_iter()
        .map(|entry| entry.track_id)
        .collect();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_request_errors_are_returned() {
    let f = start().await;

    assert!(matches!(
        f.engine.set_volume(2.0).await,
        Err(PlaybackError::InvalidVolume(_))
    ));
    assert!(matches!(
        f.engine.seek_to(Duration::from_secs(1)).await,
        Err(PlaybackError::SeekUnavailable)
    ));
    f.engine.set_volume(0.5).await.unwrap();
    assert_eq!(f.engine.snapshot().volume, 0.5);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_engine() {
    let f = start_playing().await;

    f.engine.shutdown().await.unwrap();

    assert!(!f.engine.is_running());
    assert!(matches!(f.engine.play(), Err(PlaybackError::EngineStopped)));
    assert!(matches!(
        f.engine.shutdown().await,
        Err(PlaybackError::EngineStopped)
    ));
    assert_eq!(f.media.calls().last(), Some(&MediaCall::Pause));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let media = Arc::new(FakeMediaElement::new());
    let core = CoreConfig::builder()
        .media_element(media)
        .stream_resolver(Arc::new(ScriptedResolver::new()))
        .build()
        .unwrap();

    let result = PlaybackEngine::start(
        core,
        PlaybackConfig::default().with_prefetch_threshold(2.0),
    )
    .await;
    assert!(matches!(result, Err(PlaybackError::Config(_))));
}
