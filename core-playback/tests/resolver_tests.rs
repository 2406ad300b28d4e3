//! Source resolver integration tests: deduplication, caching and failure
//! handling against scripted backends.

mod common;

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{ResolutionRequest, ResolutionResponse, StreamResolver, SystemClock};
use common::ScriptedResolver;
use core_playback::cache::CacheConfig;
use core_playback::{ContentRef, PlaybackError, SourceResolver, SourceStatus};
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn spawn(backend: Arc<dyn StreamResolver>) -> SourceResolver {
    spawn_with_timeout(backend, Duration::from_secs(15))
}

fn spawn_with_timeout(backend: Arc<dyn StreamResolver>, timeout: Duration) -> SourceResolver {
    let (resolver, _task) = SourceResolver::spawn(
        backend,
        &CacheConfig::default(),
        Arc::new(SystemClock),
        timeout,
    );
    resolver
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_resolves_share_one_backend_request() {
    let backend = Arc::new(ScriptedResolver::new());
    backend.delay("a", Duration::from_millis(200));
    let resolver = spawn(backend.clone());

    let (first, second) = tokio::join!(
        resolver.resolve(ContentRef::new("a")),
        resolver.resolve(ContentRef::new("a")),
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.url, ScriptedResolver::url_for("a"));
    assert_eq!(first.url, second.url);
    assert!(!first.from_cache);
    assert_eq!(backend.call_count("a"), 1);

    let stats = resolver.stats().await.unwrap();
    assert_eq!(stats.backend_requests, 1);
    assert_eq!(stats.in_flight, 0);
}

#[tokio::test]
async fn test_second_resolve_is_served_from_cache() {
    let backend = Arc::new(ScriptedResolver::new());
    let resolver = spawn(backend.clone());

    let first = resolver.resolve(ContentRef::new("a")).await.unwrap();
    let second = resolver.resolve(ContentRef::new("a")).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(second.resolved_at, first.resolved_at);
    assert_eq!(backend.call_count("a"), 1);
    assert!(resolver.is_cached(ContentRef::new("a")).await.unwrap());

    let stats = resolver.stats().await.unwrap();
    assert_eq!(stats.cache.hits, 1);
    assert_eq!(stats.cache.entries, 1);
}

#[tokio::test]
async fn test_failure_is_reported_and_not_cached() {
    let backend = Arc::new(ScriptedResolver::new());
    backend.fail("x", "HTTP error! status: 404");
    let resolver = spawn(backend.clone());

    match resolver.resolve(ContentRef::new("x")).await {
        Err(PlaybackError::ResolutionFailed {
            content_ref,
            message,
        }) => {
            assert_eq!(content_ref, "x");
            assert_eq!(message, "HTTP error! status: 404");
        }
        other => panic!("expected ResolutionFailed, got {:?}", other),
    }

    assert!(resolver.resolve(ContentRef::new("x")).await.is_err());
    assert_eq!(backend.call_count("x"), 2);
    assert_eq!(
        resolver.status(ContentRef::new("x")).await.unwrap(),
        SourceStatus::Unknown
    );
}

#[tokio::test(start_paused = true)]
async fn test_failure_answers_every_waiter() {
    let backend = Arc::new(ScriptedResolver::new());
    backend.delay("x", Duration::from_millis(100));
    backend.transport_error("x", "connection reset");
    let resolver = spawn(backend.clone());

    let (first, second) = tokio::join!(
        resolver.resolve(ContentRef::new("x")),
        resolver.resolve(ContentRef::new("x")),
    );

    assert!(matches!(first, Err(PlaybackError::ResolutionFailed { .. })));
    assert!(matches!(second, Err(PlaybackError::ResolutionFailed { .. })));
    assert_eq!(backend.call_count("x"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_backend_times_out() {
    let backend = Arc::new(ScriptedResolver::new());
    backend.delay("slow", Duration::from_secs(30));
    let resolver = spawn_with_timeout(backend, Duration::from_secs(1));

    match resolver.resolve(ContentRef::new("slow")).await {
        Err(PlaybackError::ResolutionFailed { message, .. }) => {
            assert!(message.contains("timed out"), "message: {}", message);
        }
        other => panic!("expected timeout failure, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_prefetch_warms_cache() {
    let backend = Arc::new(ScriptedResolver::new());
    backend.delay("next", Duration::from_millis(50));
    let resolver = spawn(backend.clone());

    resolver.prefetch(ContentRef::new("next")).await.unwrap();
    assert_eq!(
        resolver.status(ContentRef::new("next")).await.unwrap(),
        SourceStatus::InFlight
    );

    // A second prefetch while in flight is a no-op.
    resolver.prefetch(ContentRef::new("next")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(resolver.is_cached(ContentRef::new("next")).await.unwrap());

    let resolved = resolver.resolve(ContentRef::new("next")).await.unwrap();
    assert!(resolved.from_cache);
    assert_eq!(backend.call_count("next"), 1);
}

#[tokio::test]
async fn test_resolver_unavailable_after_worker_stops() {
    let backend = Arc::new(ScriptedResolver::new());
    let (resolver, task) = SourceResolver::spawn(
        backend,
        &CacheConfig::default(),
        Arc::new(SystemClock),
        Duration::from_secs(1),
    );
    task.abort();
    let _ = task.await;

    assert!(matches!(
        resolver.resolve(ContentRef::new("a")).await,
        Err(PlaybackError::ResolverUnavailable)
    ));
}

mock! {
    pub Backend {}

    #[async_trait::async_trait]
    impl StreamResolver for Backend {
        async fn resolve(&self, request: ResolutionRequest) -> BridgeResult<ResolutionResponse>;
    }
}

#[tokio::test]
async fn test_empty_url_counts_as_failure() {
    let mut backend = MockBackend::new();
    backend
        .expect_resolve()
        .times(1)
        .returning(|_| Ok(ResolutionResponse::Success { url: "  ".into() }));
    let resolver = spawn(Arc::new(backend));

    assert!(matches!(
        resolver.resolve(ContentRef::new("blank")).await,
        Err(PlaybackError::ResolutionFailed { .. })
    ));
    assert!(!resolver.is_cached(ContentRef::new("blank")).await.unwrap());
}

#[tokio::test]
async fn test_request_carries_content_ref() {
    let mut backend = MockBackend::new();
    backend
        .expect_resolve()
        .withf(|request| request.content_ref == "dQw4w9WgXcQ")
        .times(1)
        .returning(|_| {
            Ok(ResolutionResponse::Success {
                url: "https://cdn.test/stream".into(),
            })
        });
    let resolver = spawn(Arc::new(backend));

    let resolved = resolver
        .resolve(ContentRef::new("dQw4w9WgXcQ"))
        .await
        .unwrap();
    assert_eq!(resolved.url, "https://cdn.test/stream");
    assert_eq!(resolved.content_ref.as_str(), "dQw4w9WgXcQ");
}

struct PanickingBackend {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl StreamResolver for PanickingBackend {
    async fn resolve(&self, _request: ResolutionRequest) -> BridgeResult<ResolutionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("backend exploded");
    }
}

#[tokio::test]
async fn test_backend_panic_fails_waiters_and_clears_in_flight() {
    let backend = Arc::new(PanickingBackend {
        calls: AtomicUsize::new(0),
    });
    let resolver = spawn_with_timeout(backend.clone(), Duration::from_millis(200));

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        resolver.resolve(ContentRef::new("a")),
    )
    .await
    .expect("resolve hung after backend panic");
    match result {
        Err(PlaybackError::ResolutionFailed { message, .. }) => {
            assert!(message.contains("panicked"), "message: {}", message);
        }
        other => panic!("expected ResolutionFailed, got {:?}", other),
    }

    let stats = resolver.stats().await.unwrap();
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.cache.entries, 0);

    // A later resolve issues a fresh backend call instead of joining a dead one.
    assert!(resolver.resolve(ContentRef::new("a")).await.is_err());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}
