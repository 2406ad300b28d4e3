//! Observable player state.
//!
//! The engine is the only writer; hosts read the latest [`PlayerSnapshot`]
//! or await changes through a `watch` receiver. Writes that leave the
//! snapshot unchanged do not wake subscribers.

use crate::models::{PlaybackStatus, Track};
use bridge_traits::playback::DEFAULT_VOLUME;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;

/// Point-in-time view of the player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub status: PlaybackStatus,
    /// Identifies the current load. Hosts report media element events
    /// (track end, failure) against it.
    pub generation: u64,
    pub current_track: Option<Track>,
    pub current_index: Option<usize>,
    pub queue_len: usize,
    /// URL applied to the media element; `None` while loading.
    pub active_url: Option<String>,
    pub error_message: Option<String>,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub foreground: bool,
    pub volume: f32,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            generation: 0,
            current_track: None,
            current_index: None,
            queue_len: 0,
            active_url: None,
            error_message: None,
            position: Duration::ZERO,
            duration: None,
            foreground: true,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl PlayerSnapshot {
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    /// Position as a fraction of duration, when duration is known.
    pub fn progress(&self) -> Option<f64> {
        match self.duration {
            Some(duration) if !duration.is_zero() => {
                Some((self.position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0))
            }
            _ => None,
        }
    }
}

/// Single-writer holder of the current snapshot.
#[derive(Debug)]
pub struct PlayerState {
    sender: watch::Sender<PlayerSnapshot>,
}

impl PlayerState {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(PlayerSnapshot::default());
        Self { sender }
    }

    /// Apply `change` to the snapshot; subscribers are notified only if
    /// the result differs.
    pub fn update<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut PlayerSnapshot),
    {
        self.sender.send_if_modified(|snapshot| {
            let before = snapshot.clone();
            change(snapshot);
            *snapshot != before
        })
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.sender.borrow().clone()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.sender.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.sender.subscribe()
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}
