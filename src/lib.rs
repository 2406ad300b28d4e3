//! TuneBox playback client core.
//!
//! Facade over the workspace crates so host applications can depend on
//! `tunebox` alone. The `desktop-shims` feature (on by default) lets the
//! [`CoreConfig`] builder fall back to the HTTP stream resolver and the
//! tracing history sink from `bridge-desktop`.

pub use bridge_traits as bridge;
pub use core_playback as playback;
pub use core_runtime as runtime;

pub use core_playback::{
    EngineCommand, EngineHandle, PlaybackConfig, PlaybackEngine, PlaybackError, PlaybackStatus,
    PlayerSnapshot, Track,
};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{CoreEvent, EventBus};
