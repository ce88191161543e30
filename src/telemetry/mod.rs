//! Telemetry: metric name constants and the in-process collector.
//!
//! [`MetricsCollector`] keeps counters, gauges and latency reservoirs in
//! memory so percentile summaries can be read back at any time. Every
//! recording is mirrored to the `metrics` facade as well; consumers install
//! their own recorder (e.g. prometheus, statsd) and without one the facade
//! calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `europarl_`. Counters end in `_total`,
//! histograms carry their unit (`_ms`, `_bytes`).
//!
//! # Common labels
//!
//! - `endpoint`: first path segment of the requested endpoint (e.g. "meps")
//! - `status`: outcome: "ok" or "error"
//! - `kind`: error classification (see [`ErrorKind`](crate::ErrorKind))

mod collector;
mod histogram;

pub use collector::{MetricsCollector, SeriesKey};
pub use histogram::{DEFAULT_MAX_SAMPLES, HistogramSummary, Reservoir, percentile_index, quickselect};

/// Total fetches that reached the end of the pipeline.
///
/// Labels: `endpoint`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "europarl_requests_total";

/// Wall-clock duration of network-bound fetches, retries included.
///
/// Labels: `endpoint`.
pub const REQUEST_DURATION_MS: &str = "europarl_request_duration_ms";

/// Duration of a single network attempt, excluding backoff sleeps.
///
/// One observation per attempt, timed-out attempts included.
///
/// Labels: `endpoint`.
pub const ATTEMPT_DURATION_MS: &str = "europarl_attempt_duration_ms";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `endpoint`.
pub const RETRIES_TOTAL: &str = "europarl_retries_total";

/// Total attempts abandoned at their deadline.
///
/// Labels: `endpoint`.
pub const TIMEOUTS_TOTAL: &str = "europarl_timeouts_total";

/// Total terminal failures.
///
/// Labels: `endpoint`, `kind`.
pub const ERRORS_TOTAL: &str = "europarl_errors_total";

/// Total cache hits.
///
/// Labels: `endpoint`.
pub const CACHE_HITS_TOTAL: &str = "europarl_cache_hits_total";

/// Total cache misses.
///
/// Labels: `endpoint`.
pub const CACHE_MISSES_TOTAL: &str = "europarl_cache_misses_total";

/// Current number of live cache entries.
pub const CACHE_ENTRIES: &str = "europarl_cache_entries";

/// Total fetches refused by the rate limiter.
///
/// Labels: `endpoint`.
pub const RATE_LIMITED_TOTAL: &str = "europarl_rate_limited_total";

/// Tokens left in the rate-limit bucket after the last admission check.
pub const RATE_LIMIT_TOKENS: &str = "europarl_rate_limit_tokens";

/// Size of successfully read response bodies.
///
/// Labels: `endpoint`.
pub const RESPONSE_BYTES: &str = "europarl_response_bytes";
