//! The lookup orchestration state machine.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use prizm_cache::SegmentCache;
use prizm_core::error::{PrizmError, Result};
use prizm_core::{
    normalize_key, FetchOutcome, LookupPayload, LookupResult, PostalCode, SegmentSource,
    DEFAULT_FETCH_TIMEOUT_SECS, DURABLE_TTL_DAYS, TRANSIENT_TTL_DAYS,
};

/// Status-dependent cache retention.
///
/// Durable verdicts (successes, confirmed not-found, invalid format) stick
/// for months; transient failures expire quickly so they self-heal on the
/// next query after expiry.
#[derive(Clone, Copy, Debug)]
pub struct TtlPolicy {
    /// Retention for durable verdicts.
    pub durable: Duration,
    /// Retention for transient failures.
    pub transient: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            durable: Duration::days(DURABLE_TTL_DAYS),
            transient: Duration::days(TRANSIENT_TTL_DAYS),
        }
    }
}

/// The lookup orchestrator.
///
/// Holds no per-request state of its own; everything durable lives in the
/// cache store. The segment source is an exclusively owned browser
/// session, so fetches are serialized behind a mutex and bounded by a
/// timeout; an unbounded hang becomes a transient-error verdict instead of
/// wedging the service.
pub struct LookupService {
    cache: Arc<SegmentCache>,
    source: Arc<dyn SegmentSource>,
    ttl: TtlPolicy,
    fetch_timeout: StdDuration,
    fetch_lock: Mutex<()>,
}

impl LookupService {
    /// Creates a service with default TTLs and fetch timeout.
    pub fn new(cache: Arc<SegmentCache>, source: Arc<dyn SegmentSource>) -> Self {
        Self {
            cache,
            source,
            ttl: TtlPolicy::default(),
            fetch_timeout: StdDuration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Overrides the retention policy.
    pub fn with_ttl(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    /// Overrides the per-fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: StdDuration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// The cache store, for the admin pass-through surface.
    pub fn cache(&self) -> &SegmentCache {
        &self.cache
    }

    /// Looks up one raw postal-code string.
    ///
    /// Always produces a well-formed result; no error escapes to the
    /// caller.
    #[instrument(skip(self))]
    pub async fn lookup(&self, raw: &str) -> LookupResult {
        self.lookup_inner(raw).await.0
    }

    /// Looks up a batch sequentially, preserving input order.
    ///
    /// If the segment source reports an infrastructure fault (the session
    /// is gone), the remaining unprocessed codes all receive a uniform
    /// transient-error result carrying that message, without further fetch
    /// attempts and without cache writes for the placeholders.
    pub async fn lookup_batch(&self, raws: &[String]) -> Vec<LookupResult> {
        let mut results = Vec::with_capacity(raws.len());
        let mut abort_message: Option<String> = None;

        for raw in raws {
            if let Some(message) = &abort_message {
                let key = match PostalCode::parse(raw) {
                    Ok(code) => code.into_string(),
                    Err(_) => normalize_key(raw),
                };
                results.push(LookupResult::fresh(LookupPayload::transient(
                    key,
                    message.clone(),
                )));
                continue;
            }

            let (result, infra) = self.lookup_inner(raw).await;
            if let Some(message) = infra {
                warn!(message, "Aborting remainder of batch");
                abort_message = Some(message);
            }
            results.push(result);
        }

        results
    }

    /// Core state machine. The second element is the infrastructure
    /// message when the fetch could not even be attempted.
    async fn lookup_inner(&self, raw: &str) -> (LookupResult, Option<String>) {
        // 1. Validate. Format verdicts are stable, so even invalid inputs
        //    get a cache identity and a durable entry.
        let code = match PostalCode::parse(raw) {
            Ok(code) => code,
            Err(_) => {
                let key = normalize_key(raw);
                if let Some(entry) = self.cache.get(&key) {
                    debug!(key, "Invalid-format verdict served from cache");
                    return (
                        LookupResult::from_cache(entry.payload, entry.cached_at),
                        None,
                    );
                }
                info!(key, "Invalid postal code format");
                let payload = LookupPayload::invalid_format(&key);
                self.cache.put(&key, &payload, self.ttl.durable);
                return (LookupResult::fresh(payload), None);
            }
        };

        // 2. Cache read on the canonical key.
        if let Some(entry) = self.cache.get(code.as_str()) {
            debug!(code = %code, status = %entry.payload.status, "Cache hit");
            return (
                LookupResult::from_cache(entry.payload, entry.cached_at),
                None,
            );
        }

        // 3-5. Fresh fetch, classify, write through.
        match self.fetch_and_classify(&code).await {
            Ok(result) => (result, None),
            Err(e) => {
                let message = e.to_string();
                warn!(code = %code, message, "Fetch could not be attempted");
                (
                    LookupResult::fresh(LookupPayload::transient(code.as_str(), message.clone())),
                    Some(message),
                )
            }
        }
    }

    /// Runs one serialized, timeout-bounded fetch and writes the verdict
    /// through. `Err` is reserved for infrastructure faults; those are not
    /// cached because nothing was learned about the key.
    async fn fetch_and_classify(&self, code: &PostalCode) -> Result<LookupResult> {
        let outcome = {
            let _session = self.fetch_lock.lock().await;
            match tokio::time::timeout(self.fetch_timeout, self.source.fetch(code)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e @ PrizmError::Infrastructure(_))) => return Err(e),
                Ok(Err(e)) => FetchOutcome::Failed(e.to_string()),
                Err(_) => {
                    warn!(code = %code, timeout_secs = self.fetch_timeout.as_secs(), "Fetch timed out");
                    FetchOutcome::Failed(format!(
                        "lookup timed out after {}s",
                        self.fetch_timeout.as_secs()
                    ))
                }
            }
        };

        let (payload, ttl) = match outcome {
            FetchOutcome::Found(record) => {
                info!(code = %code, segment = %record.segment_number, "Lookup succeeded");
                (
                    LookupPayload::success(code.as_str(), record),
                    self.ttl.durable,
                )
            }
            FetchOutcome::NotAssigned => {
                info!(code = %code, "No segment assigned");
                (LookupPayload::not_found(code.as_str()), self.ttl.durable)
            }
            FetchOutcome::Failed(reason) => {
                warn!(code = %code, reason, "Fetch failed");
                (
                    LookupPayload::transient(code.as_str(), reason),
                    self.ttl.transient,
                )
            }
        };

        self.cache.put(code.as_str(), &payload, ttl);
        Ok(LookupResult::fresh(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use prizm_core::error::PrizmError;
    use prizm_core::{LookupStatus, Origin, SegmentRecord};

    /// Scripted source: pops one canned response per fetch and counts calls.
    struct ScriptedSource {
        responses: StdMutex<VecDeque<Result<FetchOutcome>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<FetchOutcome>>) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SegmentSource for ScriptedSource {
        async fn fetch(&self, _code: &PostalCode) -> Result<FetchOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected fetch")
        }
    }

    /// Source that never resolves, for timeout coverage.
    struct HangingSource;

    #[async_trait]
    impl SegmentSource for HangingSource {
        async fn fetch(&self, _code: &PostalCode) -> Result<FetchOutcome> {
            tokio::time::sleep(StdDuration::from_secs(3600)).await;
            Ok(FetchOutcome::NotAssigned)
        }
    }

    fn service_with(source: Arc<dyn SegmentSource>) -> LookupService {
        let cache = Arc::new(SegmentCache::open_in_memory().unwrap());
        LookupService::new(cache, source)
    }

    fn found(segment: &str) -> Result<FetchOutcome> {
        Ok(FetchOutcome::Found(SegmentRecord::new(segment)))
    }

    #[tokio::test]
    async fn test_success_then_cache_hit() {
        let source = ScriptedSource::new(vec![found("62")]);
        let service = service_with(source.clone());

        let first = service.lookup("v8a 2p4").await;
        assert_eq!(first.status, LookupStatus::Success);
        assert_eq!(first.origin, Origin::Fresh);
        assert_eq!(first.key, "V8A 2P4");
        assert_eq!(first.payload.segment_number(), Some("62"));

        let second = service.lookup("V8A2P4").await;
        assert_eq!(second.status, LookupStatus::Success);
        assert_eq!(second.origin, Origin::Cache);
        assert!(second.cached_at.is_some());

        // Both spellings resolved to one canonical key and one fetch
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_format_never_reaches_source() {
        let source = ScriptedSource::new(vec![]);
        let service = service_with(source.clone());

        let result = service.lookup("12345").await;
        assert_eq!(result.status, LookupStatus::InvalidFormat);
        assert_eq!(result.origin, Origin::Fresh);
        assert_eq!(result.key, "12345");
        assert_eq!(source.calls(), 0);

        // The verdict itself is cached
        let again = service.lookup("12345").await;
        assert_eq!(again.status, LookupStatus::InvalidFormat);
        assert_eq!(again.origin, Origin::Cache);
    }

    #[tokio::test]
    async fn test_not_found_is_cached_durably() {
        let source = ScriptedSource::new(vec![Ok(FetchOutcome::NotAssigned)]);
        let service = service_with(source.clone());

        let first = service.lookup("Z9Z 9Z9").await;
        assert_eq!(first.status, LookupStatus::NotFound);
        assert_eq!(first.origin, Origin::Fresh);

        // Re-query: served from cache, collaborator not invoked again
        let second = service.lookup("Z9Z 9Z9").await;
        assert_eq!(second.status, LookupStatus::NotFound);
        assert_eq!(second.origin, Origin::Cache);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_cached_with_short_ttl() {
        let source = ScriptedSource::new(vec![
            Ok(FetchOutcome::Failed("page mismatch".into())),
            found("41"),
        ]);
        let cache = Arc::new(SegmentCache::open_in_memory().unwrap());
        // Zero transient TTL: the failure expires immediately, so the next
        // query retries while a durable verdict would have stuck.
        let service = LookupService::new(cache, source.clone()).with_ttl(TtlPolicy {
            durable: Duration::days(90),
            transient: Duration::zero(),
        });

        let first = service.lookup("M5V 2H1").await;
        assert_eq!(first.status, LookupStatus::TransientError);
        assert_eq!(first.payload.message.as_deref(), Some("page mismatch"));

        let second = service.lookup("M5V 2H1").await;
        assert_eq!(second.status, LookupStatus::Success);
        assert_eq!(second.origin, Origin::Fresh);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_timeout_becomes_transient() {
        let service = service_with(Arc::new(HangingSource))
            .with_fetch_timeout(StdDuration::from_millis(20));

        let result = service.lookup("V8A 2P4").await;
        assert_eq!(result.status, LookupStatus::TransientError);
        assert!(result
            .payload
            .message
            .as_deref()
            .unwrap()
            .contains("timed out"));
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_mixes_statuses() {
        let source = ScriptedSource::new(vec![found("62")]);
        let service = service_with(source.clone());

        let raws = vec!["M5V 2H1".to_string(), "123456".to_string()];
        let results = service.lookup_batch(&raws).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].key, "M5V 2H1");
        assert_eq!(results[0].status, LookupStatus::Success);
        assert_eq!(results[1].key, "123456");
        assert_eq!(results[1].status, LookupStatus::InvalidFormat);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_batch_aborts_on_infrastructure_failure() {
        let source = ScriptedSource::new(vec![Err(PrizmError::Infrastructure(
            "session lost".into(),
        ))]);
        let service = service_with(source.clone());

        let raws = vec![
            "V8A 2P4".to_string(),
            "M5V 2H1".to_string(),
            "H0H 0H0".to_string(),
        ];
        let results = service.lookup_batch(&raws).await;

        assert_eq!(results.len(), 3);
        for result in &results {
            assert_eq!(result.status, LookupStatus::TransientError);
            assert!(result
                .payload
                .message
                .as_deref()
                .unwrap()
                .contains("session lost"));
        }

        // Only the first code was ever attempted
        assert_eq!(source.calls(), 1);

        // Placeholders were not written through; a later query refetches
        assert!(service.cache().get("M5V 2H1").is_none());
        assert!(service.cache().get("V8A 2P4").is_none());
    }

    #[tokio::test]
    async fn test_batch_cache_hits_skip_the_source() {
        let source = ScriptedSource::new(vec![found("62")]);
        let service = service_with(source.clone());

        service.lookup("V8A 2P4").await;

        let raws = vec!["v8a2p4".to_string(), "bogus".to_string()];
        let results = service.lookup_batch(&raws).await;
        assert_eq!(results[0].origin, Origin::Cache);
        assert_eq!(results[1].status, LookupStatus::InvalidFormat);
        assert_eq!(source.calls(), 1);
    }
}
