//! Track and status model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque reference handed to the stream resolver. Cache and in-flight
/// tracking are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    pub fn new(content_ref: impl Into<String>) -> Self {
        Self(content_ref.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A playable catalog entry. Never mutated once queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TrackPayload")]
pub struct Track {
    pub id: TrackId,
    pub content_ref: ContentRef,
    pub title: String,
    pub artist: String,
    pub thumbnail_ref: Option<String>,
}

impl Track {
    /// Create a track whose content reference equals its id.
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            content_ref: ContentRef::new(id.clone()),
            id: TrackId::new(id),
            title: title.into(),
            artist: artist.into(),
            thumbnail_ref: None,
        }
    }

    pub fn with_content_ref(mut self, content_ref: impl Into<String>) -> Self {
        self.content_ref = ContentRef::new(content_ref);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail_ref: impl Into<String>) -> Self {
        self.thumbnail_ref = Some(thumbnail_ref.into());
        self
    }
}

/// Wire shape from the track provider. `content_ref` may be missing or
/// blank, in which case the id doubles as the content reference.
#[derive(Debug, Deserialize)]
struct TrackPayload {
    id: String,
    #[serde(default)]
    content_ref: Option<String>,
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default, alias = "thumbnail")]
    thumbnail_ref: Option<String>,
}

impl From<TrackPayload> for Track {
    fn from(payload: TrackPayload) -> Self {
        let content_ref = payload
            .content_ref
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| payload.id.clone());

        Self {
            id: TrackId::new(payload.id),
            content_ref: ContentRef::new(content_ref),
            title: payload.title,
            artist: payload.artist,
            thumbnail_ref: payload.thumbnail_ref,
        }
    }
}

/// A playable URL obtained for a content reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub content_ref: ContentRef,
    pub url: String,
    pub resolved_at: DateTime<Utc>,
    /// Served from the cache without a backend request.
    pub from_cache: bool,
}

/// Playback status of the single live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
    Error,
}

impl PlaybackStatus {
    /// Whether a source is applied to the media element.
    pub fn has_source(&self) -> bool {
        matches!(self, PlaybackStatus::Playing | PlaybackStatus::Paused)
    }

    /// Ended and Error only leave through navigation or a new queue.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackStatus::Ended | PlaybackStatus::Error)
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Ended => "ended",
            PlaybackStatus::Error => "error",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_defaults_content_ref_to_id() {
        let track: Track =
            serde_json::from_str(r#"{"id":"dQw4w9WgXcQ","title":"Song","artist":"Band"}"#)
                .unwrap();

        assert_eq!(track.content_ref.as_str(), "dQw4w9WgXcQ");
        assert_eq!(track.thumbnail_ref, None);
    }

    #[test]
    fn test_payload_keeps_explicit_content_ref() {
        let track: Track = serde_json::from_str(
            r#"{"id":"t1","content_ref":"yt-123","title":"Song","artist":"Band","thumbnail":"https://img/1.jpg"}"#,
        )
        .unwrap();

        assert_eq!(track.id.as_str(), "t1");
        assert_eq!(track.content_ref.as_str(), "yt-123");
        assert_eq!(track.thumbnail_ref.as_deref(), Some("https://img/1.jpg"));
    }

    #[test]
    fn test_blank_content_ref_falls_back_to_id() {
        let track: Track =
            serde_json::from_str(r#"{"id":"t2","content_ref":"  ","title":"Song"}"#).unwrap();
        assert_eq!(track.content_ref.as_str(), "t2");
        assert_eq!(track.artist, "");
    }

    #[test]
    fn test_status_helpers() {
        assert!(PlaybackStatus::Paused.has_source());
        assert!(!PlaybackStatus::Loading.has_source());
        assert!(PlaybackStatus::Ended.is_terminal());
        assert_eq!(PlaybackStatus::default(), PlaybackStatus::Idle);
        assert_eq!(PlaybackStatus::Playing.to_string(), "playing");
    }
}
