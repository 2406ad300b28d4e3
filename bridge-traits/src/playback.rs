//! Media element bridge.
//!
//! The core never decodes audio. It hands a resolved URL to the platform's
//! media primitive (an `<audio>` element, an embedded player, a native audio
//! session) and drives it through this trait. Hosts report the element's
//! natural end and source rejections back to the engine through its command
//! handle.

use crate::{error::Result, platform::PlatformSendSync};
use std::time::Duration;

/// Volume applied when a host does not configure one.
pub const DEFAULT_VOLUME: f32 = 1.0;

/// Point-in-time view of the element's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaTimeline {
    /// Current playback position.
    pub position: Duration,
    /// Total duration, when the element knows it.
    pub duration: Option<Duration>,
}

impl MediaTimeline {
    pub fn new(position: Duration, duration: Option<Duration>) -> Self {
        Self { position, duration }
    }

    /// Fraction of the track already played, `None` while duration is unknown
    /// or zero.
    pub fn progress(&self) -> Option<f64> {
        let duration = self.duration?;
        if duration.is_zero() {
            return None;
        }
        Some(self.position.as_secs_f64() / duration.as_secs_f64())
    }
}

/// Platform media primitive driven by the transition controller.
///
/// Implementations should keep calls cheap; the engine invokes them from its
/// single control task and awaits each one before handling the next message.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaElement: PlatformSendSync {
    /// Replace the element's source. Playback does not start until `play`.
    async fn load(&self, url: &str) -> Result<()>;

    /// Start or resume playback of the loaded source.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the source and position.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Volume normalized to `0.0..=1.0`.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Current position and duration.
    async fn timeline(&self) -> Result<MediaTimeline>;

    /// Whether the element itself reports a paused state. Runtimes that
    /// throttle inactive hosts can pause the element behind the engine's back.
    async fn is_paused(&self) -> Result<bool>;

    /// Whether the element has reached the natural end of its source.
    async fn has_ended(&self) -> Result<bool>;
}
