//! # Host Bridge Traits
//!
//! Contracts between the playback core and the host platform.
//!
//! ## Traits
//!
//! ### Playback
//! - [`MediaElement`](playback::MediaElement) - the platform media primitive the core drives
//! - [`StreamResolver`](resolution::StreamResolver) - turns a content reference into a playable URL
//!
//! ### Platform Integration
//! - [`MediaSession`](media_session::MediaSession) - OS media control surface (lock screen, media keys)
//! - [`LifecycleObserver`](background::LifecycleObserver) - foreground/background transitions
//! - [`HistorySink`](history::HistorySink) - fire-and-forget listening history
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - forward structured logs to host logging
//!
//! ## Error Handling
//!
//! Every trait returns [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and keep messages actionable; the core turns
//! them into playback state rather than propagating them to callers.
//!
//! ## Thread Safety
//!
//! On native targets all traits require `Send + Sync` (see [`platform`]); the
//! engine shares implementations between its control task, the resolver
//! worker and the control-surface task.

pub mod background;
pub mod error;
pub mod history;
pub mod media_session;
pub mod platform;
pub mod playback;
pub mod resolution;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{LifecycleChangeStream, LifecycleObserver, LifecycleState};
pub use history::{HistoryEntry, HistorySink};
pub use media_session::{
    MediaAction, MediaActionHandler, MediaActionKind, MediaSession, NowPlayingMetadata,
    PositionState, SessionPlaybackState,
};
pub use playback::{MediaElement, MediaTimeline};
pub use resolution::{ResolutionRequest, ResolutionResponse, StreamResolver};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
