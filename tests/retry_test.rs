//! RetryOrchestrator: attempt counts, backoff schedule and timeouts.
//!
//! All tests run on a paused tokio clock so sleeps and deadlines resolve
//! instantly and deterministically.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use europarl_gateway::pipeline::{AttemptOutcome, RetryOrchestrator};
use europarl_gateway::telemetry::{self, MetricsCollector};
use europarl_gateway::{EuroparlError, RetryConfig};

fn orchestrator(config: RetryConfig) -> (RetryOrchestrator, Arc<MetricsCollector>) {
    let metrics = Arc::new(MetricsCollector::new());
    (RetryOrchestrator::new(config, metrics.clone()), metrics)
}

fn transient(n: u32) -> EuroparlError {
    EuroparlError::Http(format!("connection reset #{n}"))
}

#[tokio::test(start_paused = true)]
async fn transient_failure_uses_every_retry() {
    let (orch, metrics) = orchestrator(
        RetryConfig::new()
            .max_retries(2)
            .retry_delay(Duration::from_millis(100)),
    );
    let calls = Arc::new(AtomicU32::new(0));

    let attempted = orch
        .execute("meps", EuroparlError::is_transient, |_cancel| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<(), _>(transient(n))
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(attempted.session.attempt_count(), 3);
    assert_eq!(attempted.session.last_outcome(), Some(AttemptOutcome::Failure));
    assert_eq!(
        metrics.counter(telemetry::RETRIES_TOTAL, &[("endpoint", "meps")]),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn each_attempt_is_timed_without_backoff() {
    let (orch, metrics) = orchestrator(
        RetryConfig::new()
            .max_retries(2)
            .retry_delay(Duration::from_millis(100)),
    );

    let attempted = orch
        .execute("meps", EuroparlError::is_transient, |_cancel| async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Err::<(), _>(transient(0))
        })
        .await;
    assert_eq!(attempted.session.attempt_count(), 3);

    let s = metrics
        .histogram_summary(telemetry::ATTEMPT_DURATION_MS, &[("endpoint", "meps")])
        .unwrap();
    assert_eq!(s.count, 3);
    assert!(s.min >= 30.0, "min {}", s.min);
    // 100ms and 200ms backoff sleeps stay out of the samples.
    assert!(s.max < 100.0, "max {}", s.max);
}

#[tokio::test(start_paused = true)]
async fn timed_out_attempt_is_timed_at_its_deadline() {
    let (orch, metrics) = orchestrator(RetryConfig::new().timeout(Duration::from_millis(250)));

    let attempted = orch
        .execute("meps", EuroparlError::is_transient, |_cancel| {
            std::future::pending::<Result<(), EuroparlError>>()
        })
        .await;
    assert_err!(attempted.result);

    let s = metrics
        .histogram_summary(telemetry::ATTEMPT_DURATION_MS, &[("endpoint", "meps")])
        .unwrap();
    assert_eq!(s.count, 1);
    assert!((250.0..260.0).contains(&s.max), "max {}", s.max);
}

#[tokio::test(start_paused = true)]
async fn last_error_is_surfaced_on_exhaustion() {
    let (orch, _) = orchestrator(
        RetryConfig::new()
            .max_retries(2)
            .retry_delay(Duration::from_millis(10)),
    );
    let calls = Arc::new(AtomicU32::new(0));

    let err = orch
        .run("meps", |_cancel| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<(), _>(transient(n))
            }
        })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "HTTP error: connection reset #3");
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_between_attempts() {
    let (orch, _) = orchestrator(
        RetryConfig::new()
            .max_retries(2)
            .retry_delay(Duration::from_millis(100)),
    );
    let starts = Arc::new(Mutex::new(Vec::<Instant>::new()));

    let _ = orch
        .run("meps", |_cancel| {
            let starts = starts.clone();
            async move {
                starts.lock().unwrap().push(Instant::now());
                Err::<(), _>(transient(0))
            }
        })
        .await;

    let starts = starts.lock().unwrap();
    assert_eq!(starts.len(), 3);
    let first_gap = starts[1] - starts[0];
    let second_gap = starts[2] - starts[1];
    assert!(first_gap >= Duration::from_millis(100) && first_gap < Duration::from_millis(110));
    assert!(second_gap >= Duration::from_millis(200) && second_gap < Duration::from_millis(210));
}

#[tokio::test(start_paused = true)]
async fn timeout_is_never_retried() {
    let (orch, metrics) = orchestrator(
        RetryConfig::new()
            .max_retries(5)
            .timeout(Duration::from_secs(1))
            .retry_delay(Duration::from_millis(10)),
    );
    let calls = Arc::new(AtomicU32::new(0));
    let tokens = Arc::new(Mutex::new(Vec::<CancellationToken>::new()));

    let attempted = orch
        .execute("meetings", |_| true, |cancel| {
            let calls = calls.clone();
            tokens.lock().unwrap().push(cancel);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, EuroparlError>("late")
            }
        })
        .await;

    assert!(matches!(
        attempted.result,
        Err(EuroparlError::Timeout { timeout }) if timeout == Duration::from_secs(1)
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(attempted.session.attempt_count(), 1);
    assert_eq!(attempted.session.last_outcome(), Some(AttemptOutcome::TimedOut));
    assert!(tokens.lock().unwrap()[0].is_cancelled());
    assert_eq!(metrics.counter_total(telemetry::TIMEOUTS_TOTAL), 1);
    assert_eq!(metrics.counter_total(telemetry::RETRIES_TOTAL), 0);
}

#[tokio::test(start_paused = true)]
async fn attempt_deadline_is_recorded() {
    let (orch, _) = orchestrator(RetryConfig::new().timeout(Duration::from_secs(2)));
    let attempted = orch
        .execute("meps", |_| false, |_| async { Ok::<_, EuroparlError>(1) })
        .await;

    assert_ok!(&attempted.result);
    let attempt = &attempted.session.attempts[0];
    assert_eq!(attempt.deadline_at, Some(attempt.started_at + Duration::from_secs(2)));
    assert_eq!(attempt.outcome, AttemptOutcome::Success);
}

#[tokio::test(start_paused = true)]
async fn classifier_stops_non_retryable_errors() {
    let (orch, _) = orchestrator(RetryConfig::new().max_retries(3));
    let calls = Arc::new(AtomicU32::new(0));

    let result = orch
        .run_with("meps", EuroparlError::is_transient, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(EuroparlError::Api {
                    status: 404,
                    message: "not found".into(),
                    details: None,
                })
            }
        })
        .await;

    assert_err!(&result);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn recovers_after_transient_failure() {
    let (orch, _) = orchestrator(RetryConfig::new().retry_delay(Duration::from_millis(50)));
    let calls = Arc::new(AtomicU32::new(0));

    let attempted = orch
        .execute("meps", EuroparlError::is_transient, |_| {
            let calls = calls.clone();
            async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(EuroparlError::Api {
                        status: 503,
                        message: "unavailable".into(),
                        details: None,
                    }),
                    _ => Ok("ok"),
                }
            }
        })
        .await;

    assert_eq!(assert_ok!(attempted.result), "ok");
    let outcomes: Vec<_> = attempted.session.attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(outcomes, [AttemptOutcome::Failure, AttemptOutcome::Success]);
}

#[tokio::test(start_paused = true)]
async fn disabled_retries_make_one_attempt() {
    let (orch, _) = orchestrator(RetryConfig::disabled());
    let calls = Arc::new(AtomicU32::new(0));

    let _ = orch
        .run("meps", |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(transient(1))
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_config_fails_before_any_attempt() {
    let (orch, _) = orchestrator(RetryConfig::new().retry_delay(Duration::ZERO));
    let calls = Arc::new(AtomicU32::new(0));

    let attempted = orch
        .execute("meps", |_| true, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, EuroparlError>(())
            }
        })
        .await;

    assert!(matches!(attempted.result, Err(EuroparlError::InvalidInput(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(attempted.session.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn without_timeout_the_attempt_owns_cancellation() {
    let (orch, _) = orchestrator(RetryConfig::new().no_timeout());
    let value = orch
        .run("meps", |_| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, EuroparlError>(7)
        })
        .await;
    assert_eq!(value.unwrap(), 7);
}
