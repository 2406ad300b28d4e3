//! OS media control surface.
//!
//! Lock screens, hardware media keys and notification widgets all consume the
//! same three outbound updates (metadata, playback state, position) and emit
//! the same handful of inbound actions.
//!
//! - **Web**: `navigator.mediaSession`
//! - **Android**: `MediaSession` / `MediaController`
//! - **iOS**: `MPNowPlayingInfoCenter` + `MPRemoteCommandCenter`
//! - **Desktop**: MPRIS (Linux), SMTC (Windows), Now Playing (macOS)

use crate::{error::Result, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Metadata shown by the control surface for the current track.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NowPlayingMetadata {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Artwork reference (URL or platform asset id).
    pub artwork: Option<String>,
}

/// Playback state understood by control surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPlaybackState {
    None,
    Playing,
    Paused,
}

/// Scrubber state for lock-screen and notification surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    pub duration: Duration,
    pub position: Duration,
    pub playback_rate: f64,
}

/// Inbound action raised by the control surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaAction {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    /// Relative seek. `None` means the surface did not specify an offset.
    SeekBackward(Option<Duration>),
    SeekForward(Option<Duration>),
    SeekTo(Duration),
}

impl MediaAction {
    pub fn kind(&self) -> MediaActionKind {
        match self {
            MediaAction::Play => MediaActionKind::Play,
            MediaAction::Pause => MediaActionKind::Pause,
            MediaAction::NextTrack => MediaActionKind::NextTrack,
            MediaAction::PreviousTrack => MediaActionKind::PreviousTrack,
            MediaAction::SeekBackward(_) => MediaActionKind::SeekBackward,
            MediaAction::SeekForward(_) => MediaActionKind::SeekForward,
            MediaAction::SeekTo(_) => MediaActionKind::SeekTo,
        }
    }
}

/// Action identifiers used when registering handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaActionKind {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    SeekBackward,
    SeekForward,
    SeekTo,
}

impl MediaActionKind {
    /// Every action the engine knows how to handle.
    pub const ALL: [MediaActionKind; 7] = [
        MediaActionKind::Play,
        MediaActionKind::Pause,
        MediaActionKind::NextTrack,
        MediaActionKind::PreviousTrack,
        MediaActionKind::SeekBackward,
        MediaActionKind::SeekForward,
        MediaActionKind::SeekTo,
    ];
}

/// Callback invoked by the platform when the user triggers an action.
#[cfg(not(target_arch = "wasm32"))]
pub type MediaActionHandler = Arc<dyn Fn(MediaAction) + Send + Sync>;

#[cfg(target_arch = "wasm32")]
pub type MediaActionHandler = Arc<dyn Fn(MediaAction)>;

/// OS-level media control surface.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaSession: PlatformSendSync {
    /// Publish metadata for the current track.
    async fn set_metadata(&self, metadata: NowPlayingMetadata) -> Result<()>;

    /// Publish the playback state.
    async fn set_playback_state(&self, state: SessionPlaybackState) -> Result<()>;

    /// Publish the scrubber position.
    async fn set_position_state(&self, state: PositionState) -> Result<()>;

    /// Route the given actions to `handler`. A later registration for the same
    /// action replaces the earlier one.
    async fn register_actions(
        &self,
        actions: &[MediaActionKind],
        handler: MediaActionHandler,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_kind_matches_variant() {
        assert_eq!(MediaAction::Play.kind(), MediaActionKind::Play);
        assert_eq!(
            MediaAction::SeekForward(None).kind(),
            MediaActionKind::SeekForward
        );
        assert_eq!(
            MediaAction::SeekTo(Duration::from_secs(3)).kind(),
            MediaActionKind::SeekTo
        );
    }

    #[test]
    fn all_kinds_are_distinct() {
        let unique: std::collections::HashSet<_> = MediaActionKind::ALL.iter().collect();
        assert_eq!(unique.len(), MediaActionKind::ALL.len());
    }
}
