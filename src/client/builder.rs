//! Builder for configuring client instances

use std::sync::Arc;
use std::time::Duration;

use super::EuroparlClient;
use crate::audit::{AuditSink, TracingAuditSink};
use crate::cache::ResponseCache;
use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::pipeline::{
    FetchPipeline, RateLimitInterval, RateLimiter, ReqwestTransport, RetryOrchestrator, Transport,
};
use crate::telemetry::MetricsCollector;
use crate::Result;

/// Builder for [`EuroparlClient`].
///
/// Starts from [`ClientConfig::default()`]; individual setters override single
/// fields. Collaborators (clock, transport, metrics, audit sink) default to
/// the production implementations and can be swapped for tests.
pub struct ClientBuilder {
    config: ClientConfig,
    clock: Option<Arc<dyn Clock>>,
    transport: Option<Arc<dyn Transport>>,
    metrics: Option<Arc<MetricsCollector>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            clock: None,
            transport: None,
            metrics: None,
            audit: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the per-attempt deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Enable or disable retries.
    pub fn retry_enabled(mut self, enabled: bool) -> Self {
        self.config.retry_enabled = enabled;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    /// Set the base retry delay (doubled per retry).
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl_ms = ttl.as_millis() as u64;
        self
    }

    pub fn max_cache_entries(mut self, n: usize) -> Self {
        self.config.max_cache_entries = n;
        self
    }

    /// Allow `tokens` requests per `interval`.
    pub fn rate_limit(mut self, tokens: u32, interval: RateLimitInterval) -> Self {
        self.config.rate_limit_tokens = tokens;
        self.config.rate_limit_interval = interval;
        self
    }

    pub fn max_response_bytes(mut self, bytes: u64) -> Self {
        self.config.max_response_bytes = bytes;
        self
    }

    /// Use a custom time source (tests).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use a custom HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share an existing metrics collector.
    pub fn metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Send audit events to `sink` instead of `tracing`.
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Validate the configuration and assemble the client.
    ///
    /// Every client owns its own cache, bucket and metrics store unless a
    /// collector is shared explicitly via [`metrics`](Self::metrics).
    pub fn build(self) -> Result<EuroparlClient> {
        let config = self.config;
        config.validate()?;
        let retry = config.retry_config();
        retry.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(MetricsCollector::with_max_samples(config.histogram_max_samples)));
        let audit = self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink));

        let cache = Arc::new(ResponseCache::with_clock(
            &config.cache_config(),
            clock.clone(),
        ));
        let limiter = Arc::new(RateLimiter::with_clock(
            config.rate_limit_tokens,
            config.rate_limit_interval.as_duration(),
            clock.clone(),
        ));
        let orchestrator = RetryOrchestrator::with_clock(retry, clock.clone(), metrics.clone());

        let pipeline = FetchPipeline::new(
            config.base_url.clone(),
            cache,
            limiter,
            orchestrator,
            metrics,
            transport,
            audit,
            clock,
            config.cache_ttl(),
            config.max_response_bytes,
        );

        Ok(EuroparlClient::from_pipeline(Arc::new(pipeline), config))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
