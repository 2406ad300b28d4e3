//! # Event Bus System
//!
//! Typed broadcast events for the playback core, built on
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The engine owns its state and exposes it through a snapshot subscription;
//! the event bus carries the *transitions* (what happened and why) for hosts
//! that want to log, toast or analyse them:
//!
//! ```text
//! ┌────────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ TransitionController├───────>│           ├────────────>│ UI toasts  │
//! └────────────────────┘         │ EventBus  │             └────────────┘
//! ┌────────────────────┐  emit   │ (broadcast│  subscribe  ┌────────────┐
//! │ RecoveryMonitor    ├────────>│  channel) ├────────────>│ Analytics  │
//! └────────────────────┘         └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, QueueEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(CoreEvent::Queue(QueueEvent::Replaced { length: 3 })).ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Queue replaced");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender is gone, i.e. the engine shut down.
//!
//! `emit` fails when nobody is subscribed. Emitters ignore that error; events
//! are advisory.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Status transitions of the active track
    Playback(PlaybackEvent),
    /// Queue replacement and navigation
    Queue(QueueEvent),
    /// Source resolution and cache activity
    Resolver(ResolverEvent),
    /// Background/foreground handling
    Recovery(RecoveryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Queue(e) => e.description(),
            CoreEvent::Resolver(e) => e.description(),
            CoreEvent::Recovery(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Recovery(RecoveryEvent::Exhausted { .. }) => EventSeverity::Error,
            CoreEvent::Resolver(ResolverEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Recovery(RecoveryEvent::MissedTrackEnd { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::QueueFinished) => EventSeverity::Info,
            CoreEvent::Queue(QueueEvent::Replaced { .. }) => EventSeverity::Info,
            CoreEvent::Recovery(RecoveryEvent::Resumed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Status transitions of the active track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A track entered Loading.
    Loading { track_id: String },
    /// The source was applied and playback started.
    Started { track_id: String, title: String },
    /// The source was applied but playback was held because pause was
    /// requested while loading.
    StartedPaused { track_id: String },
    Paused {
        track_id: String,
        /// Position when paused (milliseconds).
        position_ms: u64,
    },
    Resumed { track_id: String, position_ms: u64 },
    /// Playback moved to a new position.
    Seeked { track_id: String, position_ms: u64 },
    /// Volume changed (0-100).
    VolumeChanged { percent: u8 },
    /// The last track ended; the queue is exhausted.
    QueueFinished,
    /// The queue was emptied and the engine is idle.
    Stopped,
    /// A track end or media failure reported for an earlier load was
    /// dropped.
    StaleMediaEvent { generation: u64, current_generation: u64 },
    Error {
        /// The track ID if available.
        track_id: Option<String>,
        /// Human-readable error message.
        message: String,
        /// Whether navigating or retrying can recover.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loading { .. } => "Track loading",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::StartedPaused { .. } => "Track loaded paused",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Seeked { .. } => "Playback position changed",
            PlaybackEvent::VolumeChanged { .. } => "Volume changed",
            PlaybackEvent::QueueFinished => "Queue finished",
            PlaybackEvent::Stopped => "Playback stopped",
            PlaybackEvent::StaleMediaEvent { .. } => "Stale media event discarded",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Queue Events
// ============================================================================

/// Queue replacement and index navigation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    Replaced { length: usize },
    Advanced { index: usize, track_id: String },
    Retreated { index: usize, track_id: String },
    /// Navigation was requested past either end of the queue.
    BoundaryReached { forward: bool },
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::Replaced { .. } => "Queue replaced",
            QueueEvent::Advanced { .. } => "Moved to next track",
            QueueEvent::Retreated { .. } => "Moved to previous track",
            QueueEvent::BoundaryReached { .. } => "Queue boundary reached",
        }
    }
}

// ============================================================================
// Resolver Events
// ============================================================================

/// Source resolution outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ResolverEvent {
    /// A source was obtained for the loading track.
    Resolved {
        content_ref: String,
        /// Served from the cache without a backend request.
        from_cache: bool,
    },
    Failed { content_ref: String, message: String },
    /// The next track's source was requested ahead of time.
    PrefetchRequested { content_ref: String },
    /// A resolution finished after its track stopped loading and was dropped.
    StaleDiscarded { track_id: String },
}

impl ResolverEvent {
    fn description(&self) -> &str {
        match self {
            ResolverEvent::Resolved { .. } => "Source resolved",
            ResolverEvent::Failed { .. } => "Source resolution failed",
            ResolverEvent::PrefetchRequested { .. } => "Prefetch requested",
            ResolverEvent::StaleDiscarded { .. } => "Stale resolution discarded",
        }
    }
}

// ============================================================================
// Recovery Events
// ============================================================================

/// Background/foreground handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RecoveryEvent {
    /// The host went to the background while playing; timers may be throttled.
    Backgrounded { track_id: Option<String> },
    Foregrounded,
    /// A resume attempt is about to run.
    ResumeAttempt { attempt: u32, max_attempts: u32 },
    Resumed { attempts: u32 },
    Exhausted { attempts: u32 },
    /// The media element finished the track while the host was inactive.
    MissedTrackEnd { track_id: String },
}

impl RecoveryEvent {
    fn description(&self) -> &str {
        match self {
            RecoveryEvent::Backgrounded { .. } => "Host moved to background",
            RecoveryEvent::Foregrounded => "Host returned to foreground",
            RecoveryEvent::ResumeAttempt { .. } => "Attempting to resume playback",
            RecoveryEvent::Resumed { .. } => "Playback resumed after background",
            RecoveryEvent::Exhausted { .. } => "Playback could not be resumed",
            RecoveryEvent::MissedTrackEnd { .. } => "Track ended while in background",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Clones share the same channel. Each `subscribe()` creates an independent
/// receiver that sees events emitted after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribes and wraps the receiver in an [`EventStream`].
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity};
///
/// let bus = EventBus::new(16);
/// let errors_only = bus
///     .stream()
///     .filter(|event| event.severity() >= EventSeverity::Error);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
