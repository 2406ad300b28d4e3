//! # Playback Engine
//!
//! Wires the playback components together and runs them on one control
//! task.
//!
//! ## Architecture
//!
//! ```text
//!  EngineHandle ──┐
//!  MediaSession ──┤ inbox                   ┌──> SourceResolver task
//!  Lifecycle    ──┼───────> engine loop ────┤
//!                 │  outcomes / retries /   └──> ControlSurfaceBridge task
//!                 │  progress ticks             (watch<PlayerSnapshot>)
//! ```
//!
//! Everything that changes playback state (commands, resolution outcomes,
//! recovery retries, progress ticks) is handled one message at a time by
//! the loop, which owns the [`TransitionController`] and the
//! [`RecoveryMonitor`]. Hosts observe state through
//! [`EngineHandle::subscribe`] and transitions through the event bus.
//!
//! The loop stops on [`EngineHandle::shutdown`] or once every handle is
//! dropped. Registering a media session gives the session a handle, so
//! hosts using one should shut down explicitly.

use crate::config::PlaybackConfig;
use crate::control_surface::ControlSurfaceBridge;
use crate::controller::{ControllerDeps, ResolutionOutcome, SeekDirection, TransitionController};
use crate::error::{PlaybackError, Result};
use crate::models::Track;
use crate::recovery::{RecoveryAction, RecoveryMonitor, RecoveryTicket};
use crate::resolver::{ResolverStats, SourceResolver};
use crate::state::PlayerSnapshot;
use bridge_traits::{LifecycleObserver, LifecycleState};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Commands accepted by the engine.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    ReplaceQueue(Vec<Track>),
    Play,
    Pause,
    Toggle,
    SkipNext,
    SkipPrevious,
    SeekTo(Duration),
    SeekBy(SeekDirection, Duration),
    SetVolume(f32),
    /// The media element reached the natural end of the source applied
    /// for load `generation`.
    TrackEnded { generation: u64 },
    /// The media element rejected or lost the source applied for load
    /// `generation`.
    MediaFailed { generation: u64, message: String },
    Lifecycle(LifecycleState),
}

enum EngineMessage {
    Command(EngineCommand),
    Request {
        command: EngineCommand,
        reply: oneshot::Sender<Result<()>>,
    },
    ResolverStats(oneshot::Sender<Result<ResolverStats>>),
    Shutdown(oneshot::Sender<()>),
}

/// Cheap, cloneable access to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    inbox: mpsc::UnboundedSender<EngineMessage>,
    snapshots: watch::Receiver<PlayerSnapshot>,
    events: EventBus,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("running", &self.is_running())
            .field("events", &self.events)
            .finish()
    }
}

impl EngineHandle {
    /// Queue a command without waiting for it to be handled.
    pub fn dispatch(&self, command: EngineCommand) -> Result<()> {
        self.inbox
            .send(EngineMessage::Command(command))
            .map_err(|_| PlaybackError::EngineStopped)
    }

    pub fn replace_queue(&self, tracks: Vec<Track>) -> Result<()> {
        self.dispatch(EngineCommand::ReplaceQueue(tracks))
    }

    pub fn play(&self) -> Result<()> {
        self.dispatch(EngineCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.dispatch(EngineCommand::Pause)
    }

    pub fn toggle(&self) -> Result<()> {
        self.dispatch(EngineCommand::Toggle)
    }

    pub fn skip_next(&self) -> Result<()> {
        self.dispatch(EngineCommand::SkipNext)
    }

    pub fn skip_previous(&self) -> Result<()> {
        self.dispatch(EngineCommand::SkipPrevious)
    }

    /// Report the natural end of a track. `generation` is
    /// [`PlayerSnapshot::generation`] as seen when its source was applied;
    /// reports for an earlier load are dropped.
    pub fn track_ended(&self, generation: u64) -> Result<()> {
        self.dispatch(EngineCommand::TrackEnded { generation })
    }

    /// Report a media element failure for the source applied for load
    /// `generation`.
    pub fn media_failed(&self, generation: u64, message: impl Into<String>) -> Result<()> {
        self.dispatch(EngineCommand::MediaFailed {
            generation,
            message: message.into(),
        })
    }

    /// Push a lifecycle change for hosts without a `LifecycleObserver`.
    pub fn lifecycle_changed(&self, state: LifecycleState) -> Result<()> {
        self.dispatch(EngineCommand::Lifecycle(state))
    }

    pub fn set_foreground(&self, foreground: bool) -> Result<()> {
        self.lifecycle_changed(LifecycleState::from_visible(foreground))
    }

    pub async fn seek_to(&self, position: Duration) -> Result<()> {
        self.request(EngineCommand::SeekTo(position)).await
    }

    pub async fn seek_by(&self, direction: SeekDirection, offset: Duration) -> Result<()> {
        self.request(EngineCommand::SeekBy(direction, offset)).await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.request(EngineCommand::SetVolume(volume)).await
    }

    /// Send a command and wait for its result.
    pub async fn request(&self, command: EngineCommand) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.inbox
            .send(EngineMessage::Request { command, reply })
            .map_err(|_| PlaybackError::EngineStopped)?;
        response.await.map_err(|_| PlaybackError::EngineStopped)?
    }

    pub async fn resolver_stats(&self) -> Result<ResolverStats> {
        let (reply, response) = oneshot::channel();
        self.inbox
            .send(EngineMessage::ResolverStats(reply))
            .map_err(|_| PlaybackError::EngineStopped)?;
        response.await.map_err(|_| PlaybackError::EngineStopped)?
    }

    /// Stop the engine and wait until it has released the media element.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.inbox
            .send(EngineMessage::Shutdown(reply))
            .map_err(|_| PlaybackError::EngineStopped)?;
        response.await.map_err(|_| PlaybackError::EngineStopped)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshots.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn event_stream(&self) -> EventStream {
        self.events.stream()
    }

    pub fn is_running(&self) -> bool {
        !self.inbox.is_closed()
    }
}

/// Entry point for starting the engine.
pub struct PlaybackEngine;

impl PlaybackEngine {
    /// Validate both configurations, spawn the resolver, engine loop and
    /// optional control-surface and lifecycle tasks, and return a handle.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip_all)]
    pub async fn start(core: CoreConfig, config: PlaybackConfig) -> Result<EngineHandle> {
        core.validate()?;
        config.validate()?;

        let events = EventBus::new(core.event_buffer_size);
        let (resolver, _resolver_task) = SourceResolver::spawn(
            Arc::clone(&core.stream_resolver),
            &config.cache,
            Arc::clone(&core.clock),
            config.resolve_timeout,
        );

        let history = if core.features.enable_history {
            core.history_sink.clone()
        } else {
            None
        };

        let (controller, outcomes) = TransitionController::new(
            ControllerDeps {
                media: Arc::clone(&core.media_element),
                resolver: resolver.clone(),
                events: events.clone(),
                history,
                clock: Arc::clone(&core.clock),
            },
            &config,
        );

        let recovery = core.features.enable_background_recovery.then(|| {
            RecoveryMonitor::new(Arc::clone(&core.media_element), events.clone(), &config)
        });

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (retries_tx, retries_rx) = mpsc::unbounded_channel();

        let handle = EngineHandle {
            inbox: inbox_tx.clone(),
            snapshots: controller.subscribe(),
            events: events.clone(),
        };

        if core.features.enable_control_surface {
            if let Some(session) = core.media_session.clone() {
                let bridge = ControlSurfaceBridge::new(session, config.session_album.clone());
                bridge.register(handle.clone(), config.seek_offset).await?;
                tokio::spawn(bridge.run(controller.subscribe(), config.position_report_interval));
                debug!("Control surface attached");
            }
        }

        if let Some(observer) = core.lifecycle_observer.clone() {
            spawn_lifecycle_pump(observer, &inbox_tx).await?;
        }

        let engine = EngineLoop {
            controller,
            recovery,
            resolver,
            retries: retries_tx,
            progress_tick_interval: config.progress_tick_interval,
        };
        tokio::spawn(engine.run(inbox_rx, outcomes, retries_rx));

        info!(features = ?core.features, "Playback engine started");
        Ok(handle)
    }
}

/// Forward observer changes into the inbox. Holds only a weak sender so it
/// never keeps the engine alive.
async fn spawn_lifecycle_pump(
    observer: Arc<dyn LifecycleObserver>,
    inbox: &mpsc::UnboundedSender<EngineMessage>,
) -> Result<()> {
    // Subscribe before reading the initial state so no change falls between.
    let mut changes = observer.subscribe_changes().await?;
    let initial = observer.get_state().await?;
    if !initial.is_foreground() {
        let _ = inbox.send(EngineMessage::Command(EngineCommand::Lifecycle(initial)));
    }

    let inbox = inbox.downgrade();

    tokio::spawn(async move {
        while let Some(state) = changes.next().await {
            let Some(inbox) = inbox.upgrade() else {
                break;
            };
            if inbox
                .send(EngineMessage::Command(EngineCommand::Lifecycle(state)))
                .is_err()
            {
                break;
            }
        }
        debug!("Lifecycle pump stopped");
    });

    Ok(())
}

struct EngineLoop {
    controller: TransitionController,
    recovery: Option<RecoveryMonitor>,
    resolver: SourceResolver,
    retries: mpsc::UnboundedSender<RecoveryTicket>,
    progress_tick_interval: Duration,
}

impl EngineLoop {
    async fn run(
        mut self,
        mut inbox: mpsc::UnboundedReceiver<EngineMessage>,
        mut outcomes: mpsc::UnboundedReceiver<ResolutionOutcome>,
        mut retries: mpsc::UnboundedReceiver<RecoveryTicket>,
    ) {
        let mut ticker = interval(self.progress_tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_reply = None;

        loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(EngineMessage::Shutdown(reply)) => {
                        shutdown_reply = Some(reply);
                        break;
                    }
                    Some(message) => self.handle(message).await,
                    None => break,
                },
                Some(outcome) = outcomes.recv() => {
                    self.controller.apply_resolution(outcome).await;
                }
                Some(ticket) = retries.recv() => self.retry(ticket).await,
                _ = ticker.tick() => self.controller.progress_tick().await,
            }
        }

        drop(inbox);
        if let Err(e) = self.controller.media().pause().await {
            debug!(error = %e, "Media element refused pause on shutdown");
        }
        info!("Playback engine stopped");

        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    async fn handle(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::Command(command) => {
                if let Err(e) = self.execute(command).await {
                    if e.is_validation_error() {
                        warn!(error = %e, "Rejected command");
                    } else {
                        error!(error = %e, "Command failed");
                    }
                }
            }
            EngineMessage::Request { command, reply } => {
                let result = self.execute(command).await;
                let _ = reply.send(result);
            }
            EngineMessage::ResolverStats(reply) => {
                let _ = reply.send(self.resolver.stats().await);
            }
            EngineMessage::Shutdown(_) => {}
        }
    }

    async fn execute(&mut self, command: EngineCommand) -> Result<()> {
        debug!(command = ?command, "Executing command");

        match command {
            EngineCommand::ReplaceQueue(tracks) => {
                self.cancel_recovery();
                self.controller.replace_queue(tracks).await;
            }
            EngineCommand::Play => self.controller.play().await,
            EngineCommand::Pause => self.controller.pause().await,
            EngineCommand::Toggle => self.controller.toggle().await,
            EngineCommand::SkipNext => self.controller.skip_next().await,
            EngineCommand::SkipPrevious => self.controller.skip_previous().await,
            EngineCommand::SeekTo(position) => {
                self.controller.seek_to(position).await?;
            }
            EngineCommand::SeekBy(direction, offset) => {
                self.controller.seek_by(direction, offset).await?;
            }
            EngineCommand::SetVolume(volume) => self.controller.set_volume(volume).await?,
            EngineCommand::TrackEnded { generation } => {
                self.controller.media_ended(generation).await;
            }
            EngineCommand::MediaFailed {
                generation,
                message,
            } => self.controller.fail_playback(generation, message),
            EngineCommand::Lifecycle(state) => self.on_lifecycle(state).await,
        }

        Ok(())
    }

    async fn on_lifecycle(&mut self, state: LifecycleState) {
        self.controller.set_foreground(state.is_foreground());

        let Some(recovery) = self.recovery.as_mut() else {
            return;
        };

        let track_id = self.controller.current_track().map(|track| track.id.clone());
        let action = recovery
            .on_lifecycle(
                state,
                self.controller.status(),
                self.controller.generation(),
                track_id.as_ref(),
            )
            .await;
        self.apply_recovery(action).await;
    }

    async fn retry(&mut self, ticket: RecoveryTicket) {
        let Some(recovery) = self.recovery.as_mut() else {
            return;
        };

        let action = recovery
            .retry(ticket, self.controller.status(), self.controller.generation())
            .await;
        self.apply_recovery(action).await;
    }

    async fn apply_recovery(&mut self, action: RecoveryAction) {
        match action {
            RecoveryAction::None | RecoveryAction::Resumed { .. } => {}
            RecoveryAction::RetryAfter { delay, ticket } => {
                let retries = self.retries.clone();
                tokio::spawn(async move {
                    sleep(delay).await;
                    let _ = retries.send(ticket);
                });
            }
            RecoveryAction::Exhausted { attempts } => {
                self.controller
                    .fail(PlaybackError::ThrottleDivergence { attempts });
            }
            RecoveryAction::MissedTrackEnd => self.controller.track_ended().await,
        }
    }

    fn cancel_recovery(&mut self) {
        if let Some(recovery) = self.recovery.as_mut() {
            recovery.cancel();
        }
    }
}
