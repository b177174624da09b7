//! Fallback and Circuit Breaker Integration Tests
//!
//! Exercises the orchestrator's provider-order invariants, breaker
//! bookkeeping, and recovery behavior with scripted providers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shopscout::core::{BreakerMap, BreakerState, Orchestrator, RetryPolicy};
use shopscout::providers::{GenerationRequest, Provider, ProviderError, ProviderKind};

/// Provider driven by a script of results; repeats the last behavior when
/// the script runs dry (empty script = always succeed).
struct ScriptedProvider {
    kind: ProviderKind,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: AtomicU32,
}

impl ScriptedProvider {
    fn new(kind: ProviderKind, script: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        })
    }

    fn always_failing(kind: ProviderKind) -> Arc<Self> {
        Self::new(kind, vec![])
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Boxing adapter: lets a shared `Arc<P>` handle be handed to the
/// orchestrator as a `Box<dyn Provider>` while the test keeps its own
/// clone to inspect call counts. A local newtype is required because the
/// orphan rule forbids implementing the foreign `Provider` trait directly
/// for the foreign `Arc<_>` in an integration test.
struct Shared<P>(Arc<P>);

#[async_trait::async_trait]
impl<P: Provider> Provider for Shared<P> {
    fn kind(&self) -> ProviderKind {
        self.0.kind()
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.0.complete(request).await
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        match script.pop_front() {
            Some(result) => result,
            // Empty constructor script means "always fail" for the
            // always_failing helper, "always succeed" otherwise is not
            // needed here, so default to a non-transient failure.
            None => Err(ProviderError::Auth("scripted failure".to_string())),
        }
    }
}

/// Provider that sleeps past any reasonable call timeout.
struct SlowProvider {
    kind: ProviderKind,
    calls: AtomicU32,
}

#[async_trait::async_trait]
impl Provider for SlowProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("too late".to_string())
    }
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay_ms: 1,
        max_delay_ms: 2,
        backoff_multiplier: 2.0,
    }
}

fn breakers(threshold: u32, timeout: Duration) -> Arc<BreakerMap> {
    Arc::new(BreakerMap::new(
        ProviderKind::FALLBACK_ORDER,
        threshold,
        timeout,
    ))
}

#[tokio::test]
async fn test_fallback_order_first_success_wins() {
    let a = ScriptedProvider::new(
        ProviderKind::Gemini,
        vec![Err(ProviderError::Auth("a down".to_string()))],
    );
    let b = ScriptedProvider::new(
        ProviderKind::OpenAi,
        vec![Err(ProviderError::RateLimited("b throttled".to_string()))],
    );
    let c = ScriptedProvider::new(ProviderKind::Anthropic, vec![Ok("from c".to_string())]);

    let map = breakers(5, Duration::from_secs(60));
    let orchestrator = Orchestrator::new(
        vec![
            Box::new(Shared(Arc::clone(&a))),
            Box::new(Shared(Arc::clone(&b))),
            Box::new(Shared(Arc::clone(&c))),
        ],
        Arc::clone(&map),
        fast_retry(3),
        Duration::from_secs(5),
    );

    let reply = orchestrator
        .generate(&GenerationRequest::new("hello"))
        .await
        .unwrap();

    assert_eq!(reply, "from c");
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
    assert_eq!(c.calls(), 1);

    // A and B each show one recorded failure; C closed with a clean count
    assert_eq!(
        map.with(ProviderKind::Gemini, |br| br.failure_count()),
        Some(1)
    );
    assert_eq!(
        map.with(ProviderKind::OpenAi, |br| br.failure_count()),
        Some(1)
    );
    assert_eq!(
        map.with(ProviderKind::Anthropic, |br| br.failure_count()),
        Some(0)
    );
    assert_eq!(map.state(ProviderKind::Anthropic), Some(BreakerState::Closed));
}

#[tokio::test]
async fn test_open_breaker_skips_provider_without_calling_it() {
    let gated = ScriptedProvider::new(ProviderKind::Gemini, vec![Ok("unreachable".to_string())]);
    let next = ScriptedProvider::new(ProviderKind::OpenAi, vec![Ok("from openai".to_string())]);

    let map = breakers(1, Duration::from_secs(3600));
    // Open the primary's breaker before the request
    map.with(ProviderKind::Gemini, |br| br.record_failure());
    assert_eq!(map.state(ProviderKind::Gemini), Some(BreakerState::Open));

    let orchestrator = Orchestrator::new(
        vec![Box::new(Shared(Arc::clone(&gated))), Box::new(Shared(Arc::clone(&next)))],
        map,
        fast_retry(3),
        Duration::from_secs(5),
    );

    let reply = orchestrator
        .generate(&GenerationRequest::new("hello"))
        .await
        .unwrap();

    assert_eq!(reply, "from openai");
    assert_eq!(gated.calls(), 0);
    assert_eq!(next.calls(), 1);
}

#[tokio::test]
async fn test_breaker_opens_after_threshold_consecutive_failures() {
    let failing = ScriptedProvider::always_failing(ProviderKind::Gemini);
    let backup = ScriptedProvider::new(
        ProviderKind::Mock,
        vec![
            Ok("ok".to_string()),
            Ok("ok".to_string()),
            Ok("ok".to_string()),
            Ok("ok".to_string()),
        ],
    );

    let map = breakers(3, Duration::from_secs(3600));
    let orchestrator = Orchestrator::new(
        vec![Box::new(Shared(Arc::clone(&failing))), Box::new(Shared(Arc::clone(&backup)))],
        Arc::clone(&map),
        fast_retry(1),
        Duration::from_secs(5),
    );

    // Three requests: each records one primary failure, then falls back
    for _ in 0..3 {
        orchestrator
            .generate(&GenerationRequest::new("hi"))
            .await
            .unwrap();
    }
    assert_eq!(failing.calls(), 3);
    assert_eq!(map.state(ProviderKind::Gemini), Some(BreakerState::Open));

    // Fourth request: the open breaker gates the primary entirely
    orchestrator
        .generate(&GenerationRequest::new("hi"))
        .await
        .unwrap();
    assert_eq!(failing.calls(), 3);
}

#[tokio::test]
async fn test_half_open_probe_success_closes_breaker() {
    let recovering = ScriptedProvider::new(
        ProviderKind::Gemini,
        vec![
            Err(ProviderError::Auth("down".to_string())),
            Ok("recovered".to_string()),
        ],
    );
    let backup = ScriptedProvider::new(ProviderKind::Mock, vec![Ok("backup".to_string())]);

    // Threshold 1, zero cooldown: the next request may probe immediately
    let map = breakers(1, Duration::ZERO);
    let orchestrator = Orchestrator::new(
        vec![
            Box::new(Shared(Arc::clone(&recovering))),
            Box::new(Shared(Arc::clone(&backup))),
        ],
        Arc::clone(&map),
        fast_retry(1),
        Duration::from_secs(5),
    );

    // First request: primary fails, breaker opens, backup answers
    let reply = orchestrator
        .generate(&GenerationRequest::new("hi"))
        .await
        .unwrap();
    assert_eq!(reply, "backup");
    assert_eq!(map.state(ProviderKind::Gemini), Some(BreakerState::Open));

    // Second request: cooldown elapsed, half-open probe succeeds
    let reply = orchestrator
        .generate(&GenerationRequest::new("hi"))
        .await
        .unwrap();
    assert_eq!(reply, "recovered");
    assert_eq!(map.state(ProviderKind::Gemini), Some(BreakerState::Closed));
    assert_eq!(
        map.with(ProviderKind::Gemini, |br| br.failure_count()),
        Some(0)
    );
}

#[tokio::test]
async fn test_total_exhaustion_is_aggregate_error() {
    let a = ScriptedProvider::always_failing(ProviderKind::Gemini);
    let b = ScriptedProvider::always_failing(ProviderKind::OpenAi);

    let orchestrator = Orchestrator::new(
        vec![Box::new(Shared(Arc::clone(&a))), Box::new(Shared(Arc::clone(&b)))],
        breakers(5, Duration::from_secs(60)),
        fast_retry(1),
        Duration::from_secs(5),
    );

    let result = orchestrator.generate(&GenerationRequest::new("hi")).await;
    let error = result.unwrap_err();
    assert!(error.to_string().contains("all providers failed"));
}

#[tokio::test]
async fn test_timed_out_call_falls_through() {
    let slow = Arc::new(SlowProvider {
        kind: ProviderKind::Gemini,
        calls: AtomicU32::new(0),
    });
    let fast = ScriptedProvider::new(ProviderKind::OpenAi, vec![Ok("fast".to_string())]);

    let map = breakers(5, Duration::from_secs(60));
    let orchestrator = Orchestrator::new(
        vec![Box::new(Shared(Arc::clone(&slow))), Box::new(Shared(Arc::clone(&fast)))],
        Arc::clone(&map),
        fast_retry(2),
        Duration::from_millis(50),
    );

    let reply = orchestrator
        .generate(&GenerationRequest::new("hi"))
        .await
        .unwrap();

    assert_eq!(reply, "fast");
    // Timeout is transient: the slow provider got its bounded retries
    assert_eq!(slow.calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        map.with(ProviderKind::Gemini, |br| br.failure_count()),
        Some(1)
    );
}

#[tokio::test]
async fn test_non_transient_failures_count_once_per_request() {
    let failing = ScriptedProvider::new(
        ProviderKind::Gemini,
        vec![Err(ProviderError::ContentBlocked("SAFETY".to_string()))],
    );
    let backup = ScriptedProvider::new(ProviderKind::Mock, vec![Ok("ok".to_string())]);

    let orchestrator = Orchestrator::new(
        vec![
            Box::new(Shared(Arc::clone(&failing))),
            Box::new(Shared(Arc::clone(&backup))),
        ],
        breakers(5, Duration::from_secs(60)),
        fast_retry(3),
        Duration::from_secs(5),
    );

    orchestrator
        .generate(&GenerationRequest::new("hi"))
        .await
        .unwrap();

    // A content block is not retried against the same provider
    assert_eq!(failing.calls(), 1);
}
