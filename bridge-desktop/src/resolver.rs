//! Stream resolver backed by the TuneBox HTTP API.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    resolution::{ResolutionRequest, ResolutionResponse, StreamResolver},
};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const STREAM_PATH: [&str; 3] = ["api", "youtube", "stream"];

/// Body returned by the stream endpoint on success.
#[derive(Debug, Deserialize)]
struct StreamBody {
    url: String,
}

/// Resolves content references with `GET {base}/api/youtube/stream/{ref}`.
///
/// Non-2xx answers and bodies without a `url` become
/// [`ResolutionResponse::Error`]; transport failures are returned as
/// [`BridgeError::OperationFailed`]. No retries happen here: the core treats
/// every failure as final for that request.
pub struct HttpStreamResolver {
    client: Client,
    base_url: Url,
}

impl HttpStreamResolver {
    /// Create a resolver for the given API base URL with a 15 s timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(15))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("tunebox-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::OperationFailed(format!("HTTP client setup: {}", e)))?;

        Self::with_client(client, base_url)
    }

    /// Use a preconfigured client (proxies, custom TLS roots).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url)
            .map_err(|e| BridgeError::OperationFailed(format!("invalid base url {}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(BridgeError::OperationFailed(format!(
                "base url cannot carry a path: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// The content reference is one percent-encoded path segment.
    fn endpoint(&self, content_ref: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BridgeError::OperationFailed(format!("base url cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(STREAM_PATH)
            .push(content_ref);
        Ok(url)
    }
}

fn interpret(status: StatusCode, body: &str) -> ResolutionResponse {
    if !status.is_success() {
        return ResolutionResponse::Error {
            message: format!("HTTP error! status: {}", status.as_u16()),
        };
    }

    match serde_json::from_str::<StreamBody>(body) {
        Ok(parsed) => ResolutionResponse::Success { url: parsed.url },
        Err(e) => ResolutionResponse::Error {
            message: format!("invalid stream response: {}", e),
        },
    }
}

#[async_trait]
impl StreamResolver for HttpStreamResolver {
    async fn resolve(&self, request: ResolutionRequest) -> Result<ResolutionResponse> {
        if request.content_ref.trim().is_empty() {
            return Ok(ResolutionResponse::Error {
                message: "empty content reference".to_string(),
            });
        }

        let endpoint = self.endpoint(&request.content_ref)?;
        debug!(content_ref = %request.content_ref, "Requesting stream url");

        let response = self.client.get(endpoint).send().await.map_err(|e| {
            warn!(content_ref = %request.content_ref, error = %e, "Stream request failed");
            if e.is_timeout() {
                BridgeError::OperationFailed("Request timed out".to_string())
            } else {
                BridgeError::OperationFailed(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(interpret(status, &body))
    }
}
