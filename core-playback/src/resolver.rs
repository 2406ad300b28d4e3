//! # Source Resolver
//!
//! Turns content references into playable URLs through the host's
//! [`StreamResolver`], with a cache in front and at most one backend request
//! per content reference at any time.
//!
//! ## Architecture
//!
//! ```text
//! SourceResolver (Clone) ──requests──> ResolverWorker ──spawn──> backend.resolve()
//!        ▲                               │    ▲                        │
//!        └───────── oneshot reply ───────┘    └────── completions ─────┘
//! ```
//!
//! The worker task owns the [`SourceCache`] and the in-flight table, so
//! concurrent callers asking for the same reference share one backend call.
//! Failures are answered to every waiter and never cached.

use crate::cache::{CacheConfig, CacheStats, SourceCache};
use crate::error::{PlaybackError, Result};
use crate::models::{ContentRef, ResolvedSource};
use bridge_traits::{Clock, ResolutionRequest, StreamResolver};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const REQUEST_BUFFER: usize = 64;

/// Where a content reference currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Cached,
    InFlight,
    Unknown,
}

/// Resolver counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub cache: CacheStats,
    /// Requests actually sent to the backend.
    pub backend_requests: u64,
    /// Content references with a backend request outstanding.
    pub in_flight: usize,
}

type Reply = oneshot::Sender<Result<ResolvedSource>>;

enum ResolverMessage {
    Resolve {
        content_ref: ContentRef,
        reply: Reply,
    },
    Prefetch {
        content_ref: ContentRef,
    },
    Status {
        content_ref: ContentRef,
        reply: oneshot::Sender<SourceStatus>,
    },
    Stats {
        reply: oneshot::Sender<ResolverStats>,
    },
}

struct Completion {
    content_ref: ContentRef,
    result: std::result::Result<String, String>,
}

/// Handle to the resolver worker.
#[derive(Clone, Debug)]
pub struct SourceResolver {
    requests: mpsc::Sender<ResolverMessage>,
}

impl SourceResolver {
    /// Start the worker on the current runtime.
    ///
    /// The worker exits once every `SourceResolver` clone is dropped.
    pub fn spawn(
        backend: Arc<dyn StreamResolver>,
        cache: &CacheConfig,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (requests_tx, requests_rx) = mpsc::channel(REQUEST_BUFFER);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let worker = ResolverWorker {
            backend,
            cache: SourceCache::new(cache, clock),
            timeout,
            in_flight: HashMap::new(),
            backend_requests: 0,
            completions: completions_tx,
        };

        let handle = tokio::spawn(worker.run(requests_rx, completions_rx));
        (
            Self {
                requests: requests_tx,
            },
            handle,
        )
    }

    /// Resolve a content reference, from cache when possible.
    ///
    /// Joins an outstanding request for the same reference instead of
    /// issuing a second one.
    pub async fn resolve(&self, content_ref: ContentRef) -> Result<ResolvedSource> {
        let (reply, response) = oneshot::channel();
        self.send(ResolverMessage::Resolve { content_ref, reply })
            .await?;
        response
            .await
            .map_err(|_| PlaybackError::ResolverUnavailable)?
    }

    /// Warm the cache for a reference without waiting for the result.
    /// Does nothing if it is already cached or being resolved.
    pub async fn prefetch(&self, content_ref: ContentRef) -> Result<()> {
        self.send(ResolverMessage::Prefetch { content_ref }).await
    }

    pub async fn status(&self, content_ref: ContentRef) -> Result<SourceStatus> {
        let (reply, response) = oneshot::channel();
        self.send(ResolverMessage::Status { content_ref, reply })
            .await?;
        response
            .await
            .map_err(|_| PlaybackError::ResolverUnavailable)
    }

    pub async fn is_cached(&self, content_ref: ContentRef) -> Result<bool> {
        Ok(self.status(content_ref).await? == SourceStatus::Cached)
    }

    pub async fn stats(&self) -> Result<ResolverStats> {
        let (reply, response) = oneshot::channel();
        self.send(ResolverMessage::Stats { reply }).await?;
        response
            .await
            .map_err(|_| PlaybackError::ResolverUnavailable)
    }

    async fn send(&self, message: ResolverMessage) -> Result<()> {
        self.requests
            .send(message)
            .await
            .map_err(|_| PlaybackError::ResolverUnavailable)
    }
}

struct ResolverWorker {
    backend: Arc<dyn StreamResolver>,
    cache: SourceCache,
    timeout: Duration,
    /// Waiters per outstanding backend request. Prefetches register with
    /// no waiters.
    in_flight: HashMap<ContentRef, Vec<Reply>>,
    backend_requests: u64,
    completions: mpsc::UnboundedSender<Completion>,
}

impl ResolverWorker {
    async fn run(
        mut self,
        mut requests: mpsc::Receiver<ResolverMessage>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        debug!("Source resolver started");

        loop {
            tokio::select! {
                message = requests.recv() => match message {
                    Some(message) => self.handle(message),
                    None => break,
                },
                Some(completion) = completions.recv() => self.complete(completion),
            }
        }

        debug!(
            abandoned = self.in_flight.len(),
            "Source resolver stopped"
        );
    }

    fn handle(&mut self, message: ResolverMessage) {
        match message {
            ResolverMessage::Resolve { content_ref, reply } => {
                if let Some(entry) = self.cache.get(&content_ref) {
                    let _ = reply.send(Ok(ResolvedSource {
                        content_ref,
                        url: entry.url,
                        resolved_at: entry.resolved_at,
                        from_cache: true,
                    }));
                    return;
                }

                match self.in_flight.get_mut(&content_ref) {
                    Some(waiters) => {
                        debug!(content_ref = %content_ref, "Joining in-flight resolution");
                        waiters.push(reply);
                    }
                    None => {
                        self.in_flight.insert(content_ref.clone(), vec![reply]);
                        self.start(content_ref);
                    }
                }
            }
            ResolverMessage::Prefetch { content_ref } => {
                if self.cache.contains_fresh(&content_ref)
                    || self.in_flight.contains_key(&content_ref)
                {
                    return;
                }
                debug!(content_ref = %content_ref, "Prefetching source");
                self.in_flight.insert(content_ref.clone(), Vec::new());
                self.start(content_ref);
            }
            ResolverMessage::Status { content_ref, reply } => {
                let status = if self.cache.contains_fresh(&content_ref) {
                    SourceStatus::Cached
                } else if self.in_flight.contains_key(&content_ref) {
                    SourceStatus::InFlight
                } else {
                    SourceStatus::Unknown
                };
                let _ = reply.send(status);
            }
            ResolverMessage::Stats { reply } => {
                let _ = reply.send(ResolverStats {
                    cache: self.cache.stats(),
                    backend_requests: self.backend_requests,
                    in_flight: self.in_flight.len(),
                });
            }
        }
    }

    fn start(&mut self, content_ref: ContentRef) {
        self.backend_requests += 1;

        let backend = Arc::clone(&self.backend);
        let completions = self.completions.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let request = ResolutionRequest::new(content_ref.as_str());
            // A panicking backend must still produce a completion.
            let call = tokio::spawn(async move { backend.resolve(request).await });
            let abort = call.abort_handle();

            let result = match tokio::time::timeout(timeout, call).await {
                Ok(Ok(Ok(response))) => response.into_result(),
                Ok(Ok(Err(e))) => Err(e.to_string()),
                Ok(Err(e)) => Err(format!("Resolver backend failed: {}", e)),
                Err(_) => {
                    abort.abort();
                    Err(format!("Resolution timed out after {:?}", timeout))
                }
            };
            let _ = completions.send(Completion {
                content_ref,
                result,
            });
        });
    }

    fn complete(&mut self, completion: Completion) {
        let Completion {
            content_ref,
            result,
        } = completion;
        let waiters = self.in_flight.remove(&content_ref).unwrap_or_default();

        match result {
            Ok(url) => {
                let entry = self.cache.insert(content_ref.clone(), url);
                info!(
                    content_ref = %content_ref,
                    waiters = waiters.len(),
                    "Resolved source"
                );
                for waiter in waiters {
                    let _ = waiter.send(Ok(ResolvedSource {
                        content_ref: content_ref.clone(),
                        url: entry.url.clone(),
                        resolved_at: entry.resolved_at,
                        from_cache: false,
                    }));
                }
            }
            Err(message) => {
                warn!(
                    content_ref = %content_ref,
                    error = %message,
                    "Source resolution failed"
                );
                for waiter in waiters {
                    let _ = waiter.send(Err(PlaybackError::ResolutionFailed {
                        content_ref: content_ref.to_string(),
                        message: message.clone(),
                    }));
                }
            }
        }
    }
}
