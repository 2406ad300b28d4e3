//! # Transition Controller
//!
//! The playback state machine. It owns the queue and the player state and is
//! the only place where `PlaybackStatus` changes.
//!
//! ```text
//! Idle ──> Loading ──> Playing <──> Paused
//!             │           │
//!             │           └──> Loading (next track) / Ended
//!             └──> Error ──(navigation)──> Loading
//! ```
//!
//! Resolution runs in a spawned task that posts a [`ResolutionOutcome`] back
//! to whoever owns the outcome receiver (the engine loop). Every load gets a
//! fresh [`LoadToken`]; an outcome whose token no longer matches the track
//! currently loading is dropped, so a slow resolution can never replace the
//! source of a newer track.

use crate::config::{PlaybackConfig, ResolutionFailurePolicy};
use crate::error::{PlaybackError, Result};
use crate::models::{PlaybackStatus, ResolvedSource, Track, TrackId};
use crate::queue::QueueManager;
use crate::resolver::SourceResolver;
use crate::state::{PlayerSnapshot, PlayerState};
use bridge_traits::{Clock, HistoryEntry, HistorySink, MediaElement};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, QueueEvent, ResolverEvent};
use core_runtime::logging::redact_url;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Identifies one load of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadToken {
    pub track_id: TrackId,
    pub generation: u64,
}

/// Result of a resolution started by the controller.
#[derive(Debug)]
pub struct ResolutionOutcome {
    pub token: LoadToken,
    pub result: Result<ResolvedSource>,
}

/// Direction of a relative seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

/// Collaborators the controller drives.
#[derive(Clone)]
pub struct ControllerDeps {
    pub media: Arc<dyn MediaElement>,
    pub resolver: SourceResolver,
    pub events: EventBus,
    pub history: Option<Arc<dyn HistorySink>>,
    pub clock: Arc<dyn Clock>,
}

pub struct TransitionController {
    media: Arc<dyn MediaElement>,
    resolver: SourceResolver,
    events: EventBus,
    history: Option<Arc<dyn HistorySink>>,
    clock: Arc<dyn Clock>,
    outcomes: mpsc::UnboundedSender<ResolutionOutcome>,

    queue: QueueManager,
    state: PlayerState,

    prefetch_threshold: f64,
    failure_policy: ResolutionFailurePolicy,

    /// Bumped on every load and queue replacement.
    generation: u64,
    /// Token of the load awaiting its resolution.
    loading: Option<LoadToken>,
    /// Pause was requested while loading.
    start_paused: bool,
    prefetch_requested: bool,
    activation_recorded: bool,
}

impl TransitionController {
    /// Create a controller and the receiver its resolution outcomes arrive
    /// on. Outcomes must be handed back through [`apply_resolution`].
    ///
    /// [`apply_resolution`]: TransitionController::apply_resolution
    pub fn new(
        deps: ControllerDeps,
        config: &PlaybackConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ResolutionOutcome>) {
        let (outcomes, outcomes_rx) = mpsc::unbounded_channel();

        let controller = Self {
            media: deps.media,
            resolver: deps.resolver,
            events: deps.events,
            history: deps.history,
            clock: deps.clock,
            outcomes,
            queue: QueueManager::new(),
            state: PlayerState::new(),
            prefetch_threshold: config.prefetch_threshold,
            failure_policy: config.resolution_failure_policy,
            generation: 0,
            loading: None,
            start_paused: false,
            prefetch_requested: false,
            activation_recorded: false,
        };

        (controller, outcomes_rx)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn status(&self) -> PlaybackStatus {
        self.state.status()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.state.subscribe()
    }

    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current()
    }

    pub fn media(&self) -> &Arc<dyn MediaElement> {
        &self.media
    }

    // ========================================================================
    // Queue and Navigation
    // ========================================================================

    /// Replace the queue and start loading its first track. An empty queue
    /// stops playback.
    #[instrument(skip(self, tracks), fields(length = tracks.len()))]
    pub async fn replace_queue(&mut self, tracks: Vec<Track>) {
        self.queue.replace(tracks);
        self.emit(CoreEvent::Queue(QueueEvent::Replaced {
            length: self.queue.len(),
        }));

        if self.queue.is_empty() {
            self.stop().await;
            return;
        }

        self.load_current().await;
    }

    /// Move to the next track and load it, whatever the current status.
    pub async fn skip_next(&mut self) {
        match self.queue.advance().cloned() {
            Some(track) => {
                self.emit_navigation(true, &track);
                self.load_track(track).await;
            }
            None => {
                debug!("Skip next ignored at end of queue");
                self.emit(CoreEvent::Queue(QueueEvent::BoundaryReached { forward: true }));
            }
        }
    }

    /// Move to the previous track and load it, whatever the current status.
    pub async fn skip_previous(&mut self) {
        match self.queue.retreat().cloned() {
            Some(track) => {
                self.emit_navigation(false, &track);
                self.load_track(track).await;
            }
            None => {
                debug!("Skip previous ignored at start of queue");
                self.emit(CoreEvent::Queue(QueueEvent::BoundaryReached { forward: false }));
            }
        }
    }

    /// The media element reported the end of the source applied for load
    /// `generation`. Reports for an earlier load are dropped.
    pub async fn media_ended(&mut self, generation: u64) {
        if self.is_stale_media_event(generation) {
            return;
        }
        self.track_ended().await;
    }

    /// Natural end of the current track. Only meaningful while playing.
    pub async fn track_ended(&mut self) {
        if self.status() != PlaybackStatus::Playing {
            debug!(status = %self.status(), "Ignoring track end outside Playing");
            return;
        }

        match self.queue.advance().cloned() {
            Some(track) => {
                self.emit_navigation(true, &track);
                self.load_track(track).await;
            }
            None => {
                info!("Queue finished");
                self.state.update(|snapshot| snapshot.status = PlaybackStatus::Ended);
                self.emit(CoreEvent::Playback(PlaybackEvent::QueueFinished));
            }
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Enter Loading for `track` and start resolving its source.
    ///
    /// `track` is the queue's current track; any earlier load in progress is
    /// superseded.
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub async fn load_track(&mut self, track: Track) {
        self.generation += 1;
        let token = LoadToken {
            track_id: track.id.clone(),
            generation: self.generation,
        };
        self.loading = Some(token.clone());
        self.start_paused = false;
        self.prefetch_requested = false;
        self.activation_recorded = false;

        if let Err(e) = self.media.pause().await {
            debug!(error = %e, "Media element refused pause before load");
        }

        let index = self.queue.current_index();
        let queue_len = self.queue.len();
        let generation = self.generation;
        self.state.update(|snapshot| {
            snapshot.status = PlaybackStatus::Loading;
            snapshot.generation = generation;
            snapshot.current_track = Some(track.clone());
            snapshot.current_index = index;
            snapshot.queue_len = queue_len;
            snapshot.active_url = None;
            snapshot.error_message = None;
            snapshot.position = Duration::ZERO;
            snapshot.duration = None;
        });
        self.emit(CoreEvent::Playback(PlaybackEvent::Loading {
            track_id: track.id.to_string(),
        }));

        let resolver = self.resolver.clone();
        let outcomes = self.outcomes.clone();
        let content_ref = track.content_ref.clone();
        tokio::spawn(async move {
            let result = resolver.resolve(content_ref).await;
            let _ = outcomes.send(ResolutionOutcome { token, result });
        });
    }

    async fn load_current(&mut self) {
        if let Some(track) = self.queue.current().cloned() {
            self.load_track(track).await;
        }
    }

    /// Apply a finished resolution if it still belongs to the loading track.
    pub async fn apply_resolution(&mut self, outcome: ResolutionOutcome) {
        if self.loading.as_ref() != Some(&outcome.token) {
            debug!(
                track_id = %outcome.token.track_id,
                generation = outcome.token.generation,
                current_generation = self.generation,
                "Discarding stale resolution"
            );
            self.emit(CoreEvent::Resolver(ResolverEvent::StaleDiscarded {
                track_id: outcome.token.track_id.to_string(),
            }));
            return;
        }
        self.loading = None;

        let track = match self.queue.current().cloned() {
            Some(track) => track,
            None => return,
        };

        match outcome.result {
            Ok(source) => {
                self.emit(CoreEvent::Resolver(ResolverEvent::Resolved {
                    content_ref: source.content_ref.to_string(),
                    from_cache: source.from_cache,
                }));
                self.apply_source(track, source).await;
            }
            Err(e) => {
                self.emit(CoreEvent::Resolver(ResolverEvent::Failed {
                    content_ref: track.content_ref.to_string(),
                    message: e.to_string(),
                }));
                self.fail(e);

                if self.failure_policy == ResolutionFailurePolicy::SkipToNext
                    && self.queue.has_next()
                {
                    info!(track_id = %track.id, "Skipping unresolvable track");
                    self.skip_next().await;
                }
            }
        }
    }

    async fn apply_source(&mut self, track: Track, source: ResolvedSource) {
        debug!(
            track_id = %track.id,
            url = %redact_url(&source.url),
            from_cache = source.from_cache,
            "Applying source"
        );

        if let Err(e) = self.media.load(&source.url).await {
            self.fail(e.into());
            return;
        }

        let url = source.url;
        self.state
            .update(|snapshot| snapshot.active_url = Some(url.clone()));

        if self.start_paused {
            self.start_paused = false;
            self.state
                .update(|snapshot| snapshot.status = PlaybackStatus::Paused);
            self.emit(CoreEvent::Playback(PlaybackEvent::StartedPaused {
                track_id: track.id.to_string(),
            }));
        } else {
            if let Err(e) = self.media.play().await {
                self.fail(e.into());
                return;
            }
            self.state
                .update(|snapshot| snapshot.status = PlaybackStatus::Playing);
            info!(track_id = %track.id, title = %track.title, "Playback started");
            self.emit(CoreEvent::Playback(PlaybackEvent::Started {
                track_id: track.id.to_string(),
                title: track.title.clone(),
            }));
        }

        self.record_activation(&track);
    }

    fn record_activation(&mut self, track: &Track) {
        if self.activation_recorded {
            return;
        }
        self.activation_recorded = true;

        let Some(sink) = self.history.clone() else {
            return;
        };

        let entry = HistoryEntry {
            activation_id: Uuid::new_v4(),
            track_id: track.id.to_string(),
            content_ref: track.content_ref.to_string(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            thumbnail_ref: track.thumbnail_ref.clone(),
            played_at: self.clock.now(),
        };

        tokio::spawn(async move {
            let track_id = entry.track_id.clone();
            if let Err(e) = sink.record(entry).await {
                warn!(track_id = %track_id, error = %e, "Failed to record history");
            }
        });
    }

    async fn stop(&mut self) {
        self.generation += 1;
        self.loading = None;
        self.start_paused = false;

        if let Err(e) = self.media.pause().await {
            debug!(error = %e, "Media element refused pause on stop");
        }

        let generation = self.generation;
        self.state.update(|snapshot| {
            *snapshot = PlayerSnapshot {
                generation,
                foreground: snapshot.foreground,
                volume: snapshot.volume,
                ..PlayerSnapshot::default()
            };
        });
        info!("Playback stopped");
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped));
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Paused → Playing. During Loading, cancels a pending start-paused.
    pub async fn play(&mut self) {
        match self.status() {
            PlaybackStatus::Paused => {
                if let Err(e) = self.media.play().await {
                    self.fail(e.into());
                    return;
                }
                self.state
                    .update(|snapshot| snapshot.status = PlaybackStatus::Playing);
                let position = self.current_position().await;
                self.emit_with_track(|track_id| PlaybackEvent::Resumed {
                    track_id,
                    position_ms: position.as_millis() as u64,
                });
            }
            PlaybackStatus::Loading => self.start_paused = false,
            status => debug!(status = %status, "Play ignored"),
        }
    }

    /// Playing → Paused. During Loading, the source will be applied paused.
    pub async fn pause(&mut self) {
        match self.status() {
            PlaybackStatus::Playing => {
                if let Err(e) = self.media.pause().await {
                    self.fail(e.into());
                    return;
                }
                let position = self.current_position().await;
                self.state.update(|snapshot| {
                    snapshot.status = PlaybackStatus::Paused;
                    snapshot.position = position;
                });
                self.emit_with_track(|track_id| PlaybackEvent::Paused {
                    track_id,
                    position_ms: position.as_millis() as u64,
                });
            }
            PlaybackStatus::Loading => self.start_paused = true,
            status => debug!(status = %status, "Pause ignored"),
        }
    }

    pub async fn toggle(&mut self) {
        match self.status() {
            PlaybackStatus::Paused => self.play().await,
            PlaybackStatus::Loading if self.start_paused => self.play().await,
            PlaybackStatus::Playing | PlaybackStatus::Loading => self.pause().await,
            status => debug!(status = %status, "Toggle ignored"),
        }
    }

    /// Seek to an absolute position, clamped to the track duration.
    /// Returns the position actually sought to.
    pub async fn seek_to(&mut self, position: Duration) -> Result<Duration> {
        if !self.status().has_source() {
            return Err(PlaybackError::SeekUnavailable);
        }

        let timeline = self.media.timeline().await?;
        let target = match timeline.duration {
            Some(duration) => position.min(duration),
            None => position,
        };

        self.media.seek(target).await?;
        self.state.update(|snapshot| {
            snapshot.position = target;
            snapshot.duration = timeline.duration;
        });
        self.emit_with_track(|track_id| PlaybackEvent::Seeked {
            track_id,
            position_ms: target.as_millis() as u64,
        });

        Ok(target)
    }

    /// Seek relative to the current position.
    pub async fn seek_by(&mut self, direction: SeekDirection, offset: Duration) -> Result<Duration> {
        if !self.status().has_source() {
            return Err(PlaybackError::SeekUnavailable);
        }

        let position = self.media.timeline().await?.position;
        let target = match direction {
            SeekDirection::Forward => position.saturating_add(offset),
            SeekDirection::Backward => position.saturating_sub(offset),
        };
        self.seek_to(target).await
    }

    pub async fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }

        self.media.set_volume(volume).await?;
        self.state.update(|snapshot| snapshot.volume = volume);
        self.emit(CoreEvent::Playback(PlaybackEvent::VolumeChanged {
            percent: (volume * 100.0).round() as u8,
        }));
        Ok(())
    }

    // ========================================================================
    // Periodic and Host Signals
    // ========================================================================

    /// Sample the media element while playing and prefetch the next track
    /// once progress passes the threshold.
    pub async fn progress_tick(&mut self) {
        if self.status() != PlaybackStatus::Playing {
            return;
        }

        let timeline = match self.media.timeline().await {
            Ok(timeline) => timeline,
            Err(e) => {
                debug!(error = %e, "Could not read media timeline");
                return;
            }
        };

        self.state.update(|snapshot| {
            snapshot.position = timeline.position;
            snapshot.duration = timeline.duration;
        });

        if self.prefetch_requested {
            return;
        }

        let past_threshold = timeline
            .progress()
            .map_or(false, |progress| progress > self.prefetch_threshold);
        if !past_threshold {
            return;
        }

        let Some(next) = self.queue.peek_next().cloned() else {
            return;
        };
        self.prefetch_requested = true;

        match self.resolver.prefetch(next.content_ref.clone()).await {
            Ok(()) => {
                debug!(track_id = %next.id, "Prefetch requested");
                self.emit(CoreEvent::Resolver(ResolverEvent::PrefetchRequested {
                    content_ref: next.content_ref.to_string(),
                }));
            }
            Err(e) => warn!(error = %e, "Prefetch request failed"),
        }
    }

    pub fn set_foreground(&mut self, foreground: bool) {
        self.state
            .update(|snapshot| snapshot.foreground = foreground);
    }

    /// The media element reported a failure for the source applied for
    /// load `generation`.
    pub fn fail_playback(&mut self, generation: u64, message: impl Into<String>) {
        let message = message.into();
        if self.is_stale_media_event(generation) {
            return;
        }
        if !self.status().has_source() {
            debug!(error = %message, status = %self.status(), "Ignoring media failure without source");
            return;
        }
        self.fail(PlaybackError::PlaybackFailed(message));
    }

    /// Enter Error with a message in the snapshot and on the event bus.
    pub fn fail(&mut self, error: PlaybackError) {
        warn!(error = %error, "Playback error");
        self.loading = None;
        self.start_paused = false;

        let message = error.to_string();
        self.state.update(|snapshot| {
            snapshot.status = PlaybackStatus::Error;
            snapshot.error_message = Some(message.clone());
        });
        self.emit(CoreEvent::Playback(PlaybackEvent::Error {
            track_id: self.queue.current().map(|track| track.id.to_string()),
            message,
            recoverable: error.is_transient(),
        }));
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn is_stale_media_event(&self, generation: u64) -> bool {
        if generation == self.generation {
            return false;
        }
        debug!(
            generation,
            current_generation = self.generation,
            "Discarding media event for a previous load"
        );
        self.emit(CoreEvent::Playback(PlaybackEvent::StaleMediaEvent {
            generation,
            current_generation: self.generation,
        }));
        true
    }

    async fn current_position(&self) -> Duration {
        match self.media.timeline().await {
            Ok(timeline) => timeline.position,
            Err(_) => self.state.snapshot().position,
        }
    }

    fn emit_navigation(&self, forward: bool, track: &Track) {
        let index = self.queue.current_index().unwrap_or_default();
        let track_id = track.id.to_string();
        let event = if forward {
            QueueEvent::Advanced { index, track_id }
        } else {
            QueueEvent::Retreated { index, track_id }
        };
        self.emit(CoreEvent::Queue(event));
    }

    fn emit_with_track<F>(&self, build: F)
    where
        F: FnOnce(String) -> PlaybackEvent,
    {
        if let Some(track) = self.queue.current() {
            self.emit(CoreEvent::Playback(build(track.id.to_string())));
        }
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.events.emit(event);
    }
}
