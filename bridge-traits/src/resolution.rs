//! Stream resolution protocol.
//!
//! Turns an opaque content reference into a playable URL. The wire shape is
//! deliberately tiny so it can sit behind a web worker, an HTTP endpoint or a
//! native extractor:
//!
//! ```text
//! request:  { "content_ref": "dQw4w9WgXcQ" }
//! response: { "status": "success", "url": "https://..." }
//!         | { "status": "error",   "message": "..." }
//! ```

use crate::{error::Result, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};

/// Request sent to the resolution backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    pub content_ref: String,
}

impl ResolutionRequest {
    pub fn new(content_ref: impl Into<String>) -> Self {
        Self {
            content_ref: content_ref.into(),
        }
    }
}

/// Response returned by the resolution backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionResponse {
    Success { url: String },
    Error { message: String },
}

impl ResolutionResponse {
    /// Collapse the response into a URL or a failure message. Callers treat
    /// every non-success response the same way.
    pub fn into_result(self) -> std::result::Result<String, String> {
        match self {
            ResolutionResponse::Success { url } if !url.trim().is_empty() => Ok(url),
            ResolutionResponse::Success { .. } => {
                Err("resolver returned an empty url".to_string())
            }
            ResolutionResponse::Error { message } => Err(message),
        }
    }
}

/// Backend that performs the actual resolution (network, extractor, ...).
///
/// `Err` is reserved for transport-level problems; upstream refusals should be
/// reported as [`ResolutionResponse::Error`]. The core handles both uniformly.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait StreamResolver: PlatformSendSync {
    async fn resolve(&self, request: ResolutionRequest) -> Result<ResolutionResponse>;
}
