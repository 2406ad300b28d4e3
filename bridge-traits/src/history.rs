//! Listening history sink.
//!
//! The core emits one entry per track activation and forgets about it. Sinks
//! own persistence, retries and error reporting.

use crate::{error::Result, platform::PlatformSendSync};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single "track started playing" record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique per activation; sinks can use it to drop duplicates.
    pub activation_id: Uuid,
    pub track_id: String,
    pub content_ref: String,
    pub title: String,
    pub artist: String,
    pub thumbnail_ref: Option<String>,
    pub played_at: DateTime<Utc>,
}

/// Persistence collaborator for listening history.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait HistorySink: PlatformSendSync {
    async fn record(&self, entry: HistoryEntry) -> Result<()>;
}
