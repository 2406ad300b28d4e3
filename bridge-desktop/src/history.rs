//! History sink that writes entries to the tracing log.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    history::{HistoryEntry, HistorySink},
};
use tracing::info;

/// Records listening history as structured `info` events under the
/// `tunebox::history` target. Useful on desktop builds where history is
/// collected from logs rather than a remote store.
#[derive(Debug, Default, Clone)]
pub struct TracingHistorySink;

impl TracingHistorySink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HistorySink for TracingHistorySink {
    async fn record(&self, entry: HistoryEntry) -> Result<()> {
        info!(
            target: "tunebox::history",
            activation_id = %entry.activation_id,
            track_id = %entry.track_id,
            title = %entry.title,
            artist = %entry.artist,
            played_at = %entry.played_at.to_rfc3339(),
            "Track played"
        );
        Ok(())
    }
}
