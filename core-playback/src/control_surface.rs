//! # Control Surface Bridge
//!
//! Mirrors the player to the OS media session (lock screen, media keys,
//! notification widgets) and routes the session's actions back into the
//! engine as ordinary commands.
//!
//! The bridge runs as its own task watching [`PlayerSnapshot`] changes.
//! Metadata and playback state are only pushed when they differ from what
//! was last published; position is pushed on a fixed cadence while playing.

use crate::controller::SeekDirection;
use crate::engine::{EngineCommand, EngineHandle};
use crate::error::Result;
use crate::models::PlaybackStatus;
use crate::state::PlayerSnapshot;
use bridge_traits::{
    MediaAction, MediaActionHandler, MediaActionKind, MediaSession, NowPlayingMetadata,
    PositionState, SessionPlaybackState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

pub struct ControlSurfaceBridge {
    session: Arc<dyn MediaSession>,
    album: Option<String>,
    last_metadata: Option<NowPlayingMetadata>,
    last_state: Option<SessionPlaybackState>,
}

impl ControlSurfaceBridge {
    pub fn new(session: Arc<dyn MediaSession>, album: Option<String>) -> Self {
        Self {
            session,
            album,
            last_metadata: None,
            last_state: None,
        }
    }

    /// Install one handler for every supported action. Relative seeks the
    /// surface sends without an offset use `default_seek`.
    pub async fn register(&self, handle: EngineHandle, default_seek: Duration) -> Result<()> {
        let handler: MediaActionHandler = Arc::new(move |action: MediaAction| {
            let command = command_for(action, default_seek);
            debug!(action = ?action.kind(), "Media session action");
            if let Err(e) = handle.dispatch(command) {
                debug!(error = %e, "Dropping media session action");
            }
        });

        self.session
            .register_actions(&MediaActionKind::ALL, handler)
            .await?;
        Ok(())
    }

    /// Publish metadata and playback state if either changed.
    pub async fn sync(&mut self, snapshot: &PlayerSnapshot) {
        let metadata = snapshot
            .current_track
            .as_ref()
            .map(|track| NowPlayingMetadata {
                title: track.title.clone(),
                artist: track.artist.clone(),
                album: self.album.clone(),
                artwork: track.thumbnail_ref.clone(),
            });

        if metadata != self.last_metadata {
            let published = metadata.clone().unwrap_or_default();
            match self.session.set_metadata(published).await {
                Ok(()) => self.last_metadata = metadata,
                Err(e) => warn!(error = %e, "Failed to publish media metadata"),
            }
        }

        let state = session_state(snapshot.status);
        if Some(state) != self.last_state {
            match self.session.set_playback_state(state).await {
                Ok(()) => self.last_state = Some(state),
                Err(e) => warn!(error = %e, "Failed to publish playback state"),
            }
        }
    }

    /// Publish the scrubber position. Only while playing with a known
    /// duration.
    pub async fn report_position(&self, snapshot: &PlayerSnapshot) {
        if !snapshot.is_playing() {
            return;
        }
        let Some(duration) = snapshot.duration else {
            return;
        };

        let state = PositionState {
            duration,
            position: snapshot.position.min(duration),
            playback_rate: 1.0,
        };
        if let Err(e) = self.session.set_position_state(state).await {
            debug!(error = %e, "Failed to publish position state");
        }
    }

    /// Follow snapshots until the engine drops its state.
    pub async fn run(
        mut self,
        mut snapshots: watch::Receiver<PlayerSnapshot>,
        report_interval: Duration,
    ) {
        let mut ticker = interval(report_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let initial = snapshots.borrow_and_update().clone();
        self.sync(&initial).await;

        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    self.sync(&snapshot).await;
                }
                _ = ticker.tick() => {
                    let snapshot = snapshots.borrow().clone();
                    self.report_position(&snapshot).await;
                }
            }
        }

        debug!("Control surface stopped");
    }
}

fn session_state(status: PlaybackStatus) -> SessionPlaybackState {
    match status {
        PlaybackStatus::Playing => SessionPlaybackState::Playing,
        PlaybackStatus::Paused => SessionPlaybackState::Paused,
        _ => SessionPlaybackState::None,
    }
}

pub(crate) fn command_for(action: MediaAction, default_seek: Duration) -> EngineCommand {
    match action {
        MediaAction::Play => EngineCommand::Play,
        MediaAction::Pause => EngineCommand::Pause,
        MediaAction::NextTrack => EngineCommand::SkipNext,
        MediaAction::PreviousTrack => EngineCommand::SkipPrevious,
        MediaAction::SeekBackward(offset) => {
            EngineCommand::SeekBy(SeekDirection::Backward, offset.unwrap_or(default_seek))
        }
        MediaAction::SeekForward(offset) => {
            EngineCommand::SeekBy(SeekDirection::Forward, offset.unwrap_or(default_seek))
        }
        MediaAction::SeekTo(position) => EngineCommand::SeekTo(position),
    }
}
