use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tracker_engine::{FailureKind, RetryPolicy, SourceError};

#[test]
fn backoff_doubles_from_the_base_delay() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(0), Duration::from_millis(500));
    assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
    assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_retries() {
    let attempts = AtomicU32::new(0);
    let started = Instant::now();

    let result: Result<(), SourceError> = RetryPolicy::default()
        .run("probe", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::new(FailureKind::Timeout, "slow")) }
        })
        .await;

    assert_eq!(result.unwrap_err().kind, FailureKind::Timeout);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn permanent_errors_are_not_retried() {
    let attempts = AtomicU32::new(0);

    let result: Result<(), SourceError> = RetryPolicy::default()
        .run("probe", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::new(FailureKind::HttpStatus(404), "missing")) }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn succeeds_on_a_later_attempt() {
    let attempts = AtomicU32::new(0);

    let result = RetryPolicy::default()
        .run("probe", || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(SourceError::new(FailureKind::HttpStatus(502), "bad gateway"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

    assert_eq!(result, Ok(1));
}
