//! # Core Configuration Module
//!
//! Collects the host bridges and feature switches the playback engine needs.
//!
//! ## Overview
//!
//! [`CoreConfigBuilder`] assembles a [`CoreConfig`] and validates it before
//! the engine starts, so a missing capability is reported at startup instead
//! of surfacing as a silent no-op during playback.
//!
//! ## Required Dependencies
//!
//! - `MediaElement` - the platform media primitive that actually plays audio
//! - `StreamResolver` - turns content references into playable URLs
//!
//! ## Optional Dependencies
//!
//! - `MediaSession` - OS media controls (required by `enable_control_surface`)
//! - `HistorySink` - listening history (required by `enable_history`)
//! - `LifecycleObserver` - foreground/background signal; hosts can also push
//!   lifecycle changes through the engine handle
//! - `Clock` - defaults to [`SystemClock`]
//!
//! When the `desktop-shims` feature is enabled, the builder can create an HTTP
//! stream resolver from a base URL and falls back to the tracing-backed
//! `HistorySink`. The desktop `LifecycleObserver` is fed by the host window
//! layer, so hosts construct and inject it themselves.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_element(Arc::new(MyAudioElement::new()))
//!     .stream_resolver(Arc::new(MyResolver::new()))
//!     .media_session(Arc::new(MyMediaSession::new()))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    Clock, HistorySink, LifecycleObserver, MediaElement, MediaSession, StreamResolver,
    SystemClock,
};
use std::sync::Arc;

/// Largest accepted event bus buffer.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Bridges and switches required to start the playback engine.
#[derive(Clone)]
pub struct CoreConfig {
    /// Media element driven by the transition controller (required)
    pub media_element: Arc<dyn MediaElement>,

    /// Stream resolution backend (required)
    pub stream_resolver: Arc<dyn StreamResolver>,

    /// OS media control surface (optional)
    pub media_session: Option<Arc<dyn MediaSession>>,

    /// Foreground/background signal source (optional)
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,

    /// Listening history sink (optional)
    pub history_sink: Option<Arc<dyn HistorySink>>,

    /// Time source for cache and history timestamps
    pub clock: Arc<dyn Clock>,

    /// Feature flags
    pub features: FeatureFlags,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("media_element", &"MediaElement { ... }")
            .field("stream_resolver", &"StreamResolver { ... }")
            .field(
                "media_session",
                &self.media_session.as_ref().map(|_| "MediaSession { ... }"),
            )
            .field(
                "lifecycle_observer",
                &self
                    .lifecycle_observer
                    .as_ref()
                    .map(|_| "LifecycleObserver { ... }"),
            )
            .field(
                "history_sink",
                &self.history_sink.as_ref().map(|_| "HistorySink { ... }"),
            )
            .field("features", &self.features)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

/// Optional engine subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Mirror state to the OS media session and accept its actions
    /// (requires MediaSession)
    pub enable_control_surface: bool,

    /// Repair playback after the host returns from the background
    pub enable_background_recovery: bool,

    /// Emit one history entry per track activation (requires HistorySink)
    pub enable_history: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_control_surface: false,
            enable_background_recovery: true,
            enable_history: false,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Event buffer size is within `1..=10_000`
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.enable_control_surface && self.media_session.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "MediaSession".to_string(),
                message: "Control surface enabled but no MediaSession provided. \
                          Disable the feature or inject a MediaSession implementation."
                    .to_string(),
            });
        }

        if self.features.enable_history && self.history_sink.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "HistorySink".to_string(),
                message: "History enabled but no HistorySink provided. \
                          Disable the feature or inject a HistorySink implementation."
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn media_element_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaElement".to_string(),
        message: "MediaElement implementation is required for playback. \
                  Web: wrap an HTMLAudioElement. \
                  Mobile: wrap the platform audio player. \
                  Desktop: wrap the embedded webview or native player."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn stream_resolver_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "StreamResolver".to_string(),
        message: "StreamResolver implementation is required to turn content references \
                  into playable URLs. Inject one, or enable the 'desktop-shims' feature \
                  and set .resolver_base_url()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_stream_resolver(base_url: Option<String>) -> Result<Arc<dyn StreamResolver>> {
    let base_url = base_url.ok_or_else(|| Error::CapabilityMissing {
        capability: "StreamResolver".to_string(),
        message: "No StreamResolver provided. Inject one or set .resolver_base_url() \
                  to use the desktop HTTP resolver."
            .to_string(),
    })?;

    let resolver = bridge_desktop::HttpStreamResolver::new(base_url).map_err(|e| {
        Error::Config(format!("Failed to create desktop stream resolver: {}", e))
    })?;
    Ok(Arc::new(resolver))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_stream_resolver(_base_url: Option<String>) -> Result<Arc<dyn StreamResolver>> {
    Err(stream_resolver_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_history_sink(enabled: bool) -> Option<Arc<dyn HistorySink>> {
    enabled.then(|| Arc::new(bridge_desktop::TracingHistorySink::new()) as Arc<dyn HistorySink>)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_history_sink(_enabled: bool) -> Option<Arc<dyn HistorySink>> {
    None
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Providing a `MediaSession` or `HistorySink` switches the matching feature
/// on; use [`features`](CoreConfigBuilder::features) or the `enable_*` setters
/// afterwards to override.
#[derive(Default)]
pub struct CoreConfigBuilder {
    media_element: Option<Arc<dyn MediaElement>>,
    stream_resolver: Option<Arc<dyn StreamResolver>>,
    resolver_base_url: Option<String>,
    media_session: Option<Arc<dyn MediaSession>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    history_sink: Option<Arc<dyn HistorySink>>,
    clock: Option<Arc<dyn Clock>>,
    features: Option<FeatureFlags>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the media element implementation (required).
    pub fn media_element(mut self, element: Arc<dyn MediaElement>) -> Self {
        self.media_element = Some(element);
        self
    }

    /// Sets the stream resolver implementation (required unless a base URL
    /// is given with `desktop-shims`).
    pub fn stream_resolver(mut self, resolver: Arc<dyn StreamResolver>) -> Self {
        self.stream_resolver = Some(resolver);
        self
    }

    /// Base URL of the HTTP resolution service, used by the desktop resolver
    /// when no `StreamResolver` is injected.
    pub fn resolver_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.resolver_base_url = Some(base_url.into());
        self
    }

    /// Sets the OS media session and enables the control surface.
    pub fn media_session(mut self, session: Arc<dyn MediaSession>) -> Self {
        self.media_session = Some(session);
        self.features_mut().enable_control_surface = true;
        self
    }

    /// Sets the lifecycle observer implementation (optional).
    pub fn lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    /// Sets the history sink and enables history emission.
    pub fn history_sink(mut self, sink: Arc<dyn HistorySink>) -> Self {
        self.history_sink = Some(sink);
        self.features_mut().enable_history = true;
        self
    }

    /// Overrides the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enable or disable the media-session control surface.
    pub fn enable_control_surface(mut self, enabled: bool) -> Self {
        self.features_mut().enable_control_surface = enabled;
        self
    }

    /// Enable or disable background recovery.
    pub fn enable_background_recovery(mut self, enabled: bool) -> Self {
        self.features_mut().enable_background_recovery = enabled;
        self
    }

    /// Enable or disable history emission.
    pub fn enable_history(mut self, enabled: bool) -> Self {
        self.features_mut().enable_history = enabled;
        self
    }

    /// Replaces all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = Some(features);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100 events
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    fn features_mut(&mut self) -> &mut FeatureFlags {
        self.features.get_or_insert_with(FeatureFlags::default)
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if:
    /// - Required bridges are missing (MediaElement, StreamResolver)
    /// - Configuration values are invalid
    /// - Feature flags are inconsistent with available bridges
    pub fn build(self) -> Result<CoreConfig> {
        let media_element = self.media_element.ok_or_else(media_element_missing_error)?;

        let stream_resolver = match self.stream_resolver {
            Some(resolver) => resolver,
            None => provide_default_stream_resolver(self.resolver_base_url)?,
        };

        let features = self.features.unwrap_or_default();

        let history_sink = match self.history_sink {
            Some(sink) => Some(sink),
            None => provide_default_history_sink(features.enable_history),
        };

        let config = CoreConfig {
            media_element,
            stream_resolver,
            media_session: self.media_session,
            lifecycle_observer: self.lifecycle_observer,
            history_sink,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            features,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
