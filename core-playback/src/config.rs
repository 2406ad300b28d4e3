//! # Playback Configuration
//!
//! Tunables for the playback engine: transition timing, prefetching,
//! background recovery and the source cache.

use crate::cache::CacheConfig;
use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the engine does when the current track's source cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionFailurePolicy {
    /// Stay on the failed track in status `Error` until the user navigates.
    #[default]
    Stop,
    /// Report the failure, then move on to the next track if there is one.
    SkipToNext,
}

/// Playback engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Playback progress (0.0-1.0) at which the next track's source is
    /// resolved ahead of time.
    ///
    /// Default: 0.8.
    #[serde(default = "default_prefetch_threshold")]
    pub prefetch_threshold: f64,

    /// How often the engine samples the media element while playing.
    ///
    /// Default: 500ms.
    #[serde(default = "default_progress_tick_interval")]
    pub progress_tick_interval: Duration,

    /// How often position is pushed to the OS media session.
    ///
    /// Default: 1 second.
    #[serde(default = "default_position_report_interval")]
    pub position_report_interval: Duration,

    /// Resume attempts after returning to the foreground before giving up.
    ///
    /// Default: 3.
    #[serde(default = "default_max_resume_attempts")]
    pub max_resume_attempts: u32,

    /// Delay between resume attempts.
    ///
    /// Default: 500ms.
    #[serde(default = "default_resume_retry_delay")]
    pub resume_retry_delay: Duration,

    /// Offset used by OS seek-forward/backward actions that carry none.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_seek_offset")]
    pub seek_offset: Duration,

    #[serde(default)]
    pub resolution_failure_policy: ResolutionFailurePolicy,

    /// Upper bound on a single backend resolution.
    ///
    /// Default: 15 seconds.
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout: Duration,

    /// Album shown by the OS media session.
    ///
    /// Default: "TuneBox".
    #[serde(default = "default_session_album")]
    pub session_album: Option<String>,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            prefetch_threshold: default_prefetch_threshold(),
            progress_tick_interval: default_progress_tick_interval(),
            position_report_interval: default_position_report_interval(),
            max_resume_attempts: default_max_resume_attempts(),
            resume_retry_delay: default_resume_retry_delay(),
            seek_offset: default_seek_offset(),
            resolution_failure_policy: ResolutionFailurePolicy::default(),
            resolve_timeout: default_resolve_timeout(),
            session_album: default_session_album(),
            cache: CacheConfig::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PlaybackError::Config(format!("Invalid playback config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_prefetch_threshold(mut self, threshold: f64) -> Self {
        self.prefetch_threshold = threshold;
        self
    }

    pub fn with_progress_tick_interval(mut self, interval: Duration) -> Self {
        self.progress_tick_interval = interval;
        self
    }

    pub fn with_position_report_interval(mut self, interval: Duration) -> Self {
        self.position_report_interval = interval;
        self
    }

    /// Set resume attempts and the delay between them.
    pub fn with_resume_policy(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_resume_attempts = max_attempts;
        self.resume_retry_delay = retry_delay;
        self
    }

    pub fn with_seek_offset(mut self, offset: Duration) -> Self {
        self.seek_offset = offset;
        self
    }

    pub fn with_resolution_failure_policy(mut self, policy: ResolutionFailurePolicy) -> Self {
        self.resolution_failure_policy = policy;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_session_album(mut self, album: Option<String>) -> Self {
        self.session_album = album;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(self.prefetch_threshold > 0.0 && self.prefetch_threshold <= 1.0) {
            return Err(PlaybackError::Config(
                "prefetch_threshold must be in (0.0, 1.0]".to_string(),
            ));
        }

        if self.progress_tick_interval.is_zero() {
            return Err(PlaybackError::Config(
                "progress_tick_interval must be > 0".to_string(),
            ));
        }

        if self.position_report_interval.is_zero() {
            return Err(PlaybackError::Config(
                "position_report_interval must be > 0".to_string(),
            ));
        }

        if self.max_resume_attempts == 0 {
            return Err(PlaybackError::Config(
                "max_resume_attempts must be at least 1".to_string(),
            ));
        }

        if self.resolve_timeout.is_zero() {
            return Err(PlaybackError::Config(
                "resolve_timeout must be > 0".to_string(),
            ));
        }

        self.cache.validate().map_err(PlaybackError::Config)?;

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_prefetch_threshold() -> f64 {
    0.8
}

fn default_progress_tick_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_position_report_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_resume_attempts() -> u32 {
    3
}

fn default_resume_retry_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_seek_offset() -> Duration {
    Duration::from_secs(10)
}

fn default_resolve_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_session_album() -> Option<String> {
    Some("TuneBox".to_string())
}
