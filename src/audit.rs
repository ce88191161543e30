//! Audit events emitted by the fetch pipeline.
//!
//! The pipeline reports one [`AuditEvent`] per `fetch` call through the
//! [`AuditSink`] trait. Persisting those events (files, databases, log
//! shipping) is left to the embedder; the crate ships a sink that writes
//! them to `tracing` and one that discards them.

use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::error::ErrorKind;

/// How a fetch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuditOutcome {
    CacheHit,
    Fetched {
        bytes: u64,
        attempts: usize,
    },
    RateLimited,
    Failed {
        #[serde(serialize_with = "serialize_kind")]
        kind: ErrorKind,
        status: Option<u16>,
        attempts: usize,
    },
}

fn serialize_kind<S: serde::Serializer>(kind: &ErrorKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.as_str())
}

/// One fetch, as seen by the audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub endpoint: String,
    pub cache_key: String,
    #[serde(flatten)]
    pub outcome: AuditOutcome,
    pub elapsed_ms: u64,
}

impl AuditEvent {
    pub fn new(
        endpoint: impl Into<String>,
        cache_key: impl Into<String>,
        outcome: AuditOutcome,
        elapsed: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            cache_key: cache_key.into(),
            outcome,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Receiver for audit events.
///
/// Called synchronously on the request path; implementations should hand
/// off expensive work rather than block.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Logs each event at `info` under the `europarl::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        match &event.outcome {
            AuditOutcome::CacheHit => info!(
                target: "europarl::audit",
                endpoint = %event.endpoint,
                key = %event.cache_key,
                elapsed_ms = event.elapsed_ms,
                "cache hit"
            ),
            AuditOutcome::Fetched { bytes, attempts } => info!(
                target: "europarl::audit",
                endpoint = %event.endpoint,
                key = %event.cache_key,
                bytes,
                attempts,
                elapsed_ms = event.elapsed_ms,
                "fetched"
            ),
            AuditOutcome::RateLimited => info!(
                target: "europarl::audit",
                endpoint = %event.endpoint,
                key = %event.cache_key,
                "rate limited"
            ),
            AuditOutcome::Failed {
                kind,
                status,
                attempts,
            } => info!(
                target: "europarl::audit",
                endpoint = %event.endpoint,
                key = %event.cache_key,
                kind = kind.as_str(),
                status = ?status,
                attempts,
                elapsed_ms = event.elapsed_ms,
                "failed"
            ),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}
