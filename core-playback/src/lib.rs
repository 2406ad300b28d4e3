//! # Playback Engine Module
//!
//! Queue, transition state machine, source resolution and background
//! recovery for the TuneBox player.
//!
//! ## Overview
//!
//! This module handles:
//! - Ordered queue with index-based navigation ([`queue`])
//! - The playback state machine and stale-resolution guard ([`controller`])
//! - Deduplicated, cached stream URL resolution off the control task
//!   ([`resolver`], [`cache`])
//! - Resuming playback the host paused while in the background ([`recovery`])
//! - Mirroring state to the OS media session ([`control_surface`])
//! - The single control task tying them together ([`engine`])
//!
//! Audio decoding is left to the platform media element behind
//! [`bridge_traits::MediaElement`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{PlaybackConfig, PlaybackEngine};
//! use core_runtime::config::CoreConfig;
//!
//! let core = CoreConfig::builder()
//!     .media_element(audio)
//!     .stream_resolver(resolver)
//!     .build()?;
//! let engine = PlaybackEngine::start(core, PlaybackConfig::default()).await?;
//!
//! engine.replace_queue(tracks)?;
//! let mut state = engine.subscribe();
//! while state.changed().await.is_ok() {
//!     println!("{:?}", state.borrow().status);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod control_surface;
pub mod controller;
pub mod engine;
pub mod error;
pub mod models;
pub mod queue;
pub mod recovery;
pub mod resolver;
pub mod state;

pub use config::{PlaybackConfig, ResolutionFailurePolicy};
pub use controller::{SeekDirection, TransitionController};
pub use engine::{EngineCommand, EngineHandle, PlaybackEngine};
pub use error::{PlaybackError, Result};
pub use models::{ContentRef, PlaybackStatus, ResolvedSource, Track, TrackId};
pub use queue::QueueManager;
pub use resolver::{ResolverStats, SourceResolver, SourceStatus};
pub use state::PlayerSnapshot;
