//! # Playback Error Types
//!
//! Failures surfaced by the playback engine. Most of them end up as status
//! `Error` plus a message in the player snapshot rather than as a returned
//! `Err`; the variants that do reach callers are validation and lifecycle
//! errors on the engine handle.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The resolver could not produce a playable URL. Covers backend
    /// refusals, transport errors and timeouts alike.
    #[error("Failed to resolve source for {content_ref}: {message}")]
    ResolutionFailed {
        content_ref: String,
        message: String,
    },

    /// The resolver task is gone (engine shutting down).
    #[error("Source resolver unavailable")]
    ResolverUnavailable,

    // ========================================================================
    // Playback Errors
    // ========================================================================
    /// The media element rejected the source or failed mid-playback.
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    /// Playback could not be resumed after the host returned to the
    /// foreground.
    #[error("Playback could not be resumed after {attempts} attempts")]
    ThrottleDivergence { attempts: u32 },

    // ========================================================================
    // Control Errors
    // ========================================================================
    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),

    /// Seeking requires a track whose source has been applied.
    #[error("Seek unavailable: no source is loaded")]
    SeekUnavailable,

    /// A command was sent after the engine stopped.
    #[error("Playback engine stopped")]
    EngineStopped,

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if navigating away or retrying can recover from this
    /// error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::ResolutionFailed { .. }
                | PlaybackError::PlaybackFailed(_)
                | PlaybackError::ThrottleDivergence { .. }
                | PlaybackError::Bridge(_)
        )
    }

    /// Returns `true` for caller mistakes that should not change playback
    /// state.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidVolume(_)
                | PlaybackError::SeekUnavailable
                | PlaybackError::Config(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
