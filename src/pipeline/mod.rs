//! The resilient fetch pipeline.
//!
//! Every sub-client funnels through [`FetchPipeline::fetch`]:
//!
//! 1. the endpoint and query are normalized into a [`CacheKey`];
//! 2. a live cache entry is returned immediately (no token, no network);
//! 3. otherwise one rate-limit token is taken, or the call fails with
//!    [`EuroparlError::RateLimited`] without waiting;
//! 4. the network attempt runs under the [`RetryOrchestrator`], with the body
//!    read through the [size guard](size_guard);
//! 5. the parsed JSON is cached and returned.
//!
//! Metrics are recorded at every stage and one [`AuditEvent`] is emitted per
//! call.

pub mod rate_limit;
pub mod retry;
pub mod size_guard;
pub mod transport;

pub use rate_limit::{RateLimitBucket, RateLimitInterval, RateLimiter};
pub use retry::{
    Attempt, AttemptOutcome, Attempted, RetryConfig, RetryOrchestrator, RetrySession,
    retry_unless_timeout,
};
pub use size_guard::{DEFAULT_MAX_RESPONSE_BYTES, LimitedBody, guard};
pub use transport::{ByteStream, HttpResponse, JSON_LD, ReqwestTransport, Transport};

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::audit::{AuditEvent, AuditOutcome, AuditSink};
use crate::cache::{CacheKey, ResponseCache, normalize_endpoint};
use crate::clock::Clock;
use crate::params::QueryParams;
use crate::telemetry::{self, MetricsCollector};
use crate::{EuroparlError, Result};

/// Composes cache, rate limiter, retry orchestrator and size guard.
///
/// Owned by one [`EuroparlClient`](crate::EuroparlClient) and shared by all
/// of its sub-clients.
pub struct FetchPipeline {
    base_url: String,
    cache: Arc<ResponseCache>,
    limiter: Arc<RateLimiter>,
    orchestrator: RetryOrchestrator,
    metrics: Arc<MetricsCollector>,
    transport: Arc<dyn Transport>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    cache_ttl: Duration,
    max_response_bytes: u64,
}

/// Body of a successful attempt.
struct Fetched {
    value: Value,
    bytes: u64,
}

impl FetchPipeline {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        base_url: impl Into<String>,
        cache: Arc<ResponseCache>,
        limiter: Arc<RateLimiter>,
        orchestrator: RetryOrchestrator,
        metrics: Arc<MetricsCollector>,
        transport: Arc<dyn Transport>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        cache_ttl: Duration,
        max_response_bytes: u64,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            cache,
            limiter,
            orchestrator,
            metrics,
            transport,
            audit,
            clock,
            cache_ttl,
            max_response_bytes,
        }
    }

    /// Fetch `endpoint` with `params`, served from cache when possible.
    #[instrument(skip_all, fields(endpoint = %endpoint))]
    pub async fn fetch(&self, endpoint: &str, params: &QueryParams) -> Result<Value> {
        let started = self.clock.now();
        let key = CacheKey::new(endpoint, params);
        let label = endpoint_label(endpoint);
        let labels = [("endpoint", label.as_str())];

        if let Some(value) = self.cache.get(key.as_str()) {
            debug!(key = %key, "cache hit");
            self.metrics
                .increment_counter(telemetry::CACHE_HITS_TOTAL, 1, &labels);
            self.metrics.increment_counter(
                telemetry::REQUESTS_TOTAL,
                1,
                &[("endpoint", label.as_str()), ("status", "ok")],
            );
            self.emit(&label, &key, AuditOutcome::CacheHit, started);
            return Ok(value);
        }
        self.metrics
            .increment_counter(telemetry::CACHE_MISSES_TOTAL, 1, &labels);
        // The lookup may have dropped an expired entry.
        self.metrics
            .set_gauge(telemetry::CACHE_ENTRIES, self.cache.len() as f64, &[]);

        let admitted = self.limiter.try_acquire(1);
        self.metrics.set_gauge(
            telemetry::RATE_LIMIT_TOKENS,
            self.limiter.available_tokens(),
            &[],
        );
        if !admitted {
            let retry_after = self.limiter.time_until_available(1);
            self.metrics
                .increment_counter(telemetry::RATE_LIMITED_TOTAL, 1, &labels);
            self.metrics.increment_counter(
                telemetry::ERRORS_TOTAL,
                1,
                &[("endpoint", label.as_str()), ("kind", "rate_limited")],
            );
            self.metrics.increment_counter(
                telemetry::REQUESTS_TOTAL,
                1,
                &[("endpoint", label.as_str()), ("status", "error")],
            );
            warn!(key = %key, ?retry_after, "rate limit exceeded");
            self.emit(&label, &key, AuditOutcome::RateLimited, started);
            return Err(EuroparlError::RateLimited { retry_after });
        }

        let url = self.url_for(endpoint);
        let query = params.to_pairs();
        let attempted = self
            .orchestrator
            .execute(&label, EuroparlError::is_transient, |cancel| {
                self.attempt(&url, &query, &label, cancel)
            })
            .await;
        let attempts = attempted.session.attempt_count();

        let elapsed = self.clock.now().saturating_duration_since(started);
        self.metrics.observe_histogram(
            telemetry::REQUEST_DURATION_MS,
            elapsed.as_secs_f64() * 1000.0,
            &labels,
        );

        match attempted.result {
            Ok(Fetched { value, bytes }) => {
                self.cache.set(key.as_str(), value.clone(), self.cache_ttl);
                self.metrics
                    .set_gauge(telemetry::CACHE_ENTRIES, self.cache.len() as f64, &[]);
                self.metrics.increment_counter(
                    telemetry::REQUESTS_TOTAL,
                    1,
                    &[("endpoint", label.as_str()), ("status", "ok")],
                );
                self.emit(&label, &key, AuditOutcome::Fetched { bytes, attempts }, started);
                Ok(value)
            }
            Err(e) => {
                let kind = e.kind();
                self.metrics.increment_counter(
                    telemetry::ERRORS_TOTAL,
                    1,
                    &[("endpoint", label.as_str()), ("kind", kind.as_str())],
                );
                self.metrics.increment_counter(
                    telemetry::REQUESTS_TOTAL,
                    1,
                    &[("endpoint", label.as_str()), ("status", "error")],
                );
                warn!(key = %key, attempts, error = %e, "fetch failed");
                self.emit(
                    &label,
                    &key,
                    AuditOutcome::Failed {
                        kind,
                        status: e.status_code(),
                        attempts,
                    },
                    started,
                );
                Err(e)
            }
        }
    }

    /// One network try: GET, size-guarded read, JSON parse.
    async fn attempt(
        &self,
        url: &str,
        query: &[(String, String)],
        label: &str,
        cancel: CancellationToken,
    ) -> Result<Fetched> {
        let response = self.transport.get(url, query, cancel).await?;

        if let Some(advertised) = response.content_length
            && advertised > self.max_response_bytes
        {
            return Err(EuroparlError::SizeLimitExceeded {
                limit: self.max_response_bytes,
                received: advertised,
            });
        }

        let status = response.status;
        let success = response.is_success();
        let body = guard(response.body, self.max_response_bytes).await?;

        if !success {
            return Err(rejection(status, &body));
        }

        let bytes = body.len() as u64;
        self.metrics.observe_histogram(
            telemetry::RESPONSE_BYTES,
            bytes as f64,
            &[("endpoint", label)],
        );
        let value = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&body)?
        };
        Ok(Fetched { value, bytes })
    }

    /// Drop the cached response for `endpoint` + `params`, if any.
    pub fn invalidate(&self, endpoint: &str, params: &QueryParams) -> bool {
        let removed = self.cache.invalidate(CacheKey::new(endpoint, params).as_str());
        self.metrics
            .set_gauge(telemetry::CACHE_ENTRIES, self.cache.len() as f64, &[]);
        removed
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        self.metrics.set_gauge(telemetry::CACHE_ENTRIES, 0.0, &[]);
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn retry_config(&self) -> &RetryConfig {
        self.orchestrator.config()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_response_bytes(&self) -> u64 {
        self.max_response_bytes
    }

    /// Absolute URL for an endpoint path.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, normalize_endpoint(endpoint))
    }

    fn emit(
        &self,
        label: &str,
        key: &CacheKey,
        outcome: AuditOutcome,
        started: tokio::time::Instant,
    ) {
        let elapsed = self.clock.now().saturating_duration_since(started);
        self.audit
            .record(&AuditEvent::new(label, key.as_str(), outcome, elapsed));
    }
}

impl std::fmt::Debug for FetchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPipeline")
            .field("base_url", &self.base_url)
            .field("transport", &self.transport.name())
            .field("cache_ttl", &self.cache_ttl)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish_non_exhaustive()
    }
}

/// Metric label for an endpoint: its first path segment.
pub(crate) fn endpoint_label(endpoint: &str) -> String {
    let path = normalize_endpoint(endpoint);
    let first = path.split(['/', '?']).next().unwrap_or_default();
    if first.is_empty() {
        "root".to_string()
    } else {
        first.to_string()
    }
}

/// Build an [`EuroparlError::Api`] from a non-2xx status and its body.
///
/// Looks for a `message` (or `error`, `title`, `detail`) string in a JSON
/// body and keeps the whole document as details. Non-JSON bodies are used
/// verbatim as the message, truncated.
fn rejection(status: u16, body: &[u8]) -> EuroparlError {
    const MAX_MESSAGE_CHARS: usize = 512;

    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let from_json = parsed.as_ref().and_then(|doc| {
        ["message", "error", "title", "detail"]
            .iter()
            .find_map(|field| doc.get(*field).and_then(Value::as_str))
            .map(str::to_owned)
    });
    let message = from_json.unwrap_or_else(|| {
        let text = String::from_utf8_lossy(body);
        let text = text.trim();
        if text.is_empty() {
            format!("HTTP {status}")
        } else {
            text.chars().take(MAX_MESSAGE_CHARS).collect()
        }
    });

    EuroparlError::Api {
        status,
        message,
        details: parsed.filter(|v| v.is_object() || v.is_array()),
    }
}
