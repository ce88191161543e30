//! Retry configuration, delay calculation, and the timeout/retry orchestrator.
//!
//! [`RetryOrchestrator`] runs one logical request as a sequence of
//! attempts. Each attempt races the caller's future against a deadline;
//! on expiry the attempt's [`CancellationToken`] is cancelled, the future
//! is dropped and the request fails with [`EuroparlError::Timeout`].
//!
//! Retry policy:
//!
//! - A timeout is terminal. It is never retried.
//! - Any other failure is retried only if the classifier says so, up to
//!   `max_retries` additional attempts.
//! - Before attempt `n + 1` the orchestrator sleeps `retry_delay * 2^n`
//!   (0-indexed), with no jitter and no cap.
//! - On exhaustion the last observed error is returned as-is.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::telemetry::{self, MetricsCollector};
use crate::{EuroparlError, Result};

/// Configuration for timeouts and retries.
///
/// ```rust
/// # use europarl_gateway::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_retries(2)
///     .timeout(Duration::from_secs(5))
///     .retry_delay(Duration::from_millis(100));
/// assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first. 0 = no retry. Default: 3.
    pub max_retries: u32,
    /// Per-attempt deadline. `None` leaves cancellation to the attempt
    /// itself. Default: 10s.
    pub timeout: Option<Duration>,
    /// Base delay before the first retry. Default: 1s.
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Some(Duration::from_secs(10)),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set the number of additional attempts.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the per-attempt deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Remove the per-attempt deadline.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set the base delay before the first retry.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Total attempts this config allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after failed attempt `attempt` (0-indexed): `retry_delay * 2^attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Reject a zero timeout or a zero retry delay.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(EuroparlError::InvalidInput(
                "timeout must be greater than zero".into(),
            ));
        }
        if self.retry_delay.is_zero() {
            return Err(EuroparlError::InvalidInput(
                "retry delay must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure,
    TimedOut,
}

/// One network try.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub started_at: Instant,
    pub deadline_at: Option<Instant>,
    pub outcome: AttemptOutcome,
}

/// Attempts made for one logical request.
#[derive(Debug, Clone)]
pub struct RetrySession {
    pub attempts: Vec<Attempt>,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetrySession {
    fn new(config: &RetryConfig) -> Self {
        Self {
            attempts: Vec::new(),
            max_retries: config.max_retries,
            base_delay: config.retry_delay,
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn last_outcome(&self) -> Option<AttemptOutcome> {
        self.attempts.last().map(|a| a.outcome)
    }
}

/// Result of [`RetryOrchestrator::execute`]: the terminal outcome plus the
/// attempts that led to it.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    pub session: RetrySession,
}

/// Default retry classifier: everything except timeouts.
pub fn retry_unless_timeout(err: &EuroparlError) -> bool {
    !matches!(err, EuroparlError::Timeout { .. })
}

/// Wraps attempts with a deadline and exponential-backoff retries.
pub struct RetryOrchestrator {
    config: RetryConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricsCollector>,
}

impl RetryOrchestrator {
    pub fn new(config: RetryConfig, metrics: Arc<MetricsCollector>) -> Self {
        Self::with_clock(config, Arc::new(SystemClock), metrics)
    }

    pub fn with_clock(
        config: RetryConfig,
        clock: Arc<dyn Clock>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            config,
            clock,
            metrics,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run with the default classifier ([`retry_unless_timeout`]).
    pub async fn run<F, Fut, T>(&self, operation: &str, attempt_fn: F) -> Result<T>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute(operation, retry_unless_timeout, attempt_fn)
            .await
            .result
    }

    /// Run with a custom retry classifier.
    pub async fn run_with<F, Fut, T, C>(
        &self,
        operation: &str,
        should_retry: C,
        attempt_fn: F,
    ) -> Result<T>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&EuroparlError) -> bool,
    {
        self.execute(operation, should_retry, attempt_fn)
            .await
            .result
    }

    /// Run attempts until success, a non-retryable failure, a timeout, or
    /// exhaustion, returning the outcome together with the attempt log.
    ///
    /// The config is validated before the first attempt.
    pub async fn execute<F, Fut, T, C>(
        &self,
        operation: &str,
        should_retry: C,
        mut attempt_fn: F,
    ) -> Attempted<T>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&EuroparlError) -> bool,
    {
        let mut session = RetrySession::new(&self.config);
        if let Err(e) = self.config.validate() {
            return Attempted { result: Err(e), session };
        }

        let mut attempt: u32 = 0;
        loop {
            let started_at = self.clock.now();
            let deadline_at = self.config.timeout.map(|t| started_at + t);
            let cancel = CancellationToken::new();
            let fut = attempt_fn(cancel.clone());

            let result = match self.config.timeout {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(result) => result,
                    Err(_) => {
                        cancel.cancel();
                        Err(EuroparlError::Timeout { timeout: limit })
                    }
                },
                None => fut.await,
            };
            let attempt_ms = self
                .clock
                .now()
                .saturating_duration_since(started_at)
                .as_secs_f64()
                * 1000.0;
            self.metrics.observe_histogram(
                telemetry::ATTEMPT_DURATION_MS,
                attempt_ms,
                &[("endpoint", operation)],
            );

            let mut record = |outcome| {
                session.attempts.push(Attempt {
                    started_at,
                    deadline_at,
                    outcome,
                })
            };

            match result {
                Ok(value) => {
                    record(AttemptOutcome::Success);
                    return Attempted {
                        result: Ok(value),
                        session,
                    };
                }
                Err(e @ EuroparlError::Timeout { .. }) => {
                    record(AttemptOutcome::TimedOut);
                    self.metrics
                        .increment_counter(telemetry::TIMEOUTS_TOTAL, 1, &[("endpoint", operation)]);
                    warn!(
                        endpoint = operation,
                        attempt = attempt + 1,
                        error = %e,
                        "attempt timed out"
                    );
                    return Attempted {
                        result: Err(e),
                        session,
                    };
                }
                Err(e) => {
                    record(AttemptOutcome::Failure);
                    if attempt >= self.config.max_retries || !should_retry(&e) {
                        return Attempted {
                            result: Err(e),
                            session,
                        };
                    }
                    let delay = self.config.delay_for_attempt(attempt);
                    self.metrics
                        .increment_counter(telemetry::RETRIES_TOTAL, 1, &[("endpoint", operation)]);
                    warn!(
                        endpoint = operation,
                        attempt = attempt + 1,
                        max_attempts = self.config.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
