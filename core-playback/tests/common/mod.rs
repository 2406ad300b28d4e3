//! Shared fakes for playback integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    HistoryEntry, HistorySink, LifecycleChangeStream, LifecycleObserver, LifecycleState,
    MediaAction, MediaActionHandler, MediaActionKind, MediaElement,
    MediaSession, MediaTimeline, NowPlayingMetadata, PositionState, ResolutionRequest,
    ResolutionResponse, SessionPlaybackState, StreamResolver,
};
use core_playback::state::PlayerSnapshot;
use core_playback::Track;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

// ============================================================================
// Media Element
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    Load(String),
    Play,
    Pause,
    Seek(Duration),
    SetVolume(f32),
}

/// In-memory media element. `stuck` makes `play()` leave it paused, the way
/// a throttled host does.
pub struct FakeMediaElement {
    calls: Mutex<Vec<MediaCall>>,
    timeline: Mutex<MediaTimeline>,
    paused: AtomicBool,
    ended: AtomicBool,
    stuck: AtomicBool,
}

impl FakeMediaElement {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            timeline: Mutex::new(MediaTimeline::default()),
            paused: AtomicBool::new(true),
            ended: AtomicBool::new(false),
            stuck: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MediaCall::Load(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn play_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == MediaCall::Play)
            .count()
    }

    pub fn set_timeline(&self, position: Duration, duration: Option<Duration>) {
        *self.timeline.lock().unwrap() = MediaTimeline::new(position, duration);
    }

    /// Simulate the host pausing audio behind the player's back.
    pub fn force_pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn set_stuck(&self, stuck: bool) {
        self.stuck.store(stuck, Ordering::SeqCst);
    }

    pub fn set_ended(&self, ended: bool) {
        self.ended.store(ended, Ordering::SeqCst);
    }

    fn record(&self, call: MediaCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MediaElement for FakeMediaElement {
    async fn load(&self, url: &str) -> BridgeResult<()> {
        self.record(MediaCall::Load(url.to_string()));
        self.ended.store(false, Ordering::SeqCst);
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.record(MediaCall::Play);
        if !self.stuck.load(Ordering::SeqCst) {
            self.paused.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record(MediaCall::Pause);
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn seek(&self, position: Duration) -> BridgeResult<()> {
        self.record(MediaCall::Seek(position));
        self.timeline.lock().unwrap().position = position;
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> BridgeResult<()> {
        self.record(MediaCall::SetVolume(volume));
        Ok(())
    }

    async fn timeline(&self) -> BridgeResult<MediaTimeline> {
        Ok(*self.timeline.lock().unwrap())
    }

    async fn is_paused(&self) -> BridgeResult<bool> {
        Ok(self.paused.load(Ordering::SeqCst))
    }

    async fn has_ended(&self) -> BridgeResult<bool> {
        Ok(self.ended.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Stream Resolver
// ============================================================================

/// Resolver answering `https://cdn.test/{content_ref}` unless scripted
/// otherwise.
#[derive(Default)]
pub struct ScriptedResolver {
    failures: Mutex<HashMap<String, String>>,
    transport_errors: Mutex<HashMap<String, String>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url_for(content_ref: &str) -> String {
        format!("https://cdn.test/{}?sig=abc", content_ref)
    }

    pub fn fail(&self, content_ref: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(content_ref.to_string(), message.to_string());
    }

    pub fn transport_error(&self, content_ref: &str, message: &str) {
        self.transport_errors
            .lock()
            .unwrap()
            .insert(content_ref.to_string(), message.to_string());
    }

    pub fn delay(&self, content_ref: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(content_ref.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, content_ref: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.as_str() == content_ref)
            .count()
    }
}

#[async_trait]
impl StreamResolver for ScriptedResolver {
    async fn resolve(&self, request: ResolutionRequest) -> BridgeResult<ResolutionResponse> {
        let content_ref = request.content_ref.clone();
        self.calls.lock().unwrap().push(content_ref.clone());

        let delay = self.delays.lock().unwrap().get(&content_ref).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.transport_errors.lock().unwrap().get(&content_ref) {
            return Err(BridgeError::OperationFailed(message.clone()));
        }

        if let Some(message) = self.failures.lock().unwrap().get(&content_ref) {
            return Ok(ResolutionResponse::Error {
                message: message.clone(),
            });
        }

        Ok(ResolutionResponse::Success {
            url: Self::url_for(&content_ref),
        })
    }
}

// ============================================================================
// Media Session
// ============================================================================

#[derive(Default)]
pub struct RecordingSession {
    handler: Mutex<Option<MediaActionHandler>>,
    registered: Mutex<Vec<MediaActionKind>>,
    pub metadata: Mutex<Vec<NowPlayingMetadata>>,
    pub states: Mutex<Vec<SessionPlaybackState>>,
    pub positions: Mutex<Vec<PositionState>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the user pressing a lock-screen or media-key control.
    pub fn trigger(&self, action: MediaAction) {
        let handler = self.handler.lock().unwrap().clone();
        match handler {
            Some(handler) => handler(action),
            None => panic!("no media action handler registered"),
        }
    }

    pub fn registered(&self) -> Vec<MediaActionKind> {
        self.registered.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSession for RecordingSession {
    async fn set_metadata(&self, metadata: NowPlayingMetadata) -> BridgeResult<()> {
        self.metadata.lock().unwrap().push(metadata);
        Ok(())
    }

    async fn set_playback_state(&self, state: SessionPlaybackState) -> BridgeResult<()> {
        self.states.lock().unwrap().push(state);
        Ok(())
    }

    async fn set_position_state(&self, state: PositionState) -> BridgeResult<()> {
        self.positions.lock().unwrap().push(state);
        Ok(())
    }

    async fn register_actions(
        &self,
        actions: &[MediaActionKind],
        handler: MediaActionHandler,
    ) -> BridgeResult<()> {
        self.registered.lock().unwrap().extend_from_slice(actions);
        *self.handler.lock().unwrap() = Some(handler);
        Ok(())
    }
}

// ============================================================================
// History Sink
// ============================================================================

#[derive(Default)]
pub struct RecordingHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl RecordingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistorySink for RecordingHistory {
    async fn record(&self, entry: HistoryEntry) -> BridgeResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

// ============================================================================
// Lifecycle Observer
// ============================================================================

/// Observer whose state is set directly by the test.
pub struct ManualLifecycle {
    state: watch::Sender<LifecycleState>,
    after_read: Mutex<Option<LifecycleState>>,
}

impl ManualLifecycle {
    pub fn new(initial: LifecycleState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            after_read: Mutex::new(None),
        }
    }

    pub fn set(&self, state: LifecycleState) {
        self.state.send_replace(state);
    }

    /// Switch to `state` right after the next `get_state` has answered.
    pub fn change_after_read(&self, state: LifecycleState) {
        *self.after_read.lock().unwrap() = Some(state);
    }
}

#[async_trait]
impl LifecycleObserver for ManualLifecycle {
    async fn get_state(&self) -> BridgeResult<LifecycleState> {
        let current = *self.state.borrow();
        if let Some(next) = self.after_read.lock().unwrap().take() {
            self.state.send_replace(next);
        }
        Ok(current)
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn LifecycleChangeStream>> {
        Ok(Box::new(ManualLifecycleStream {
            receiver: self.state.subscribe(),
        }))
    }
}

struct ManualLifecycleStream {
    receiver: watch::Receiver<LifecycleState>,
}

#[async_trait]
impl LifecycleChangeStream for ManualLifecycleStream {
    async fn next(&mut self) -> Option<LifecycleState> {
        self.receiver.changed().await.ok()?;
        let state = *self.receiver.borrow_and_update();
        Some(state)
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Song {}", id), "Artist")
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

/// Wait until the snapshot satisfies `predicate`, failing after 5 seconds
/// of (possibly paused) time.
pub async fn wait_for<F>(
    snapshots: &mut watch::Receiver<PlayerSnapshot>,
    predicate: F,
) -> PlayerSnapshot
where
    F: FnMut(&PlayerSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), snapshots.wait_for(predicate))
        .await
        .expect("timed out waiting for player state")
        .expect("engine dropped its state")
        .clone()
}

/// Let spawned tasks run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
