//! Integration tests for the execution façade.
//!
//! These cover the composed pipeline end to end:
//! - Plain success with no policies configured
//! - Retry exhaustion, clamping, and inter-attempt delay
//! - Fallback conversion of the last failure
//! - Per-attempt deadlines and deadline dominance
//! - User failures passing through unchanged

use prometheus_ripcord::{cancel, util, BoxError, Execution, ExecutionError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_plain_task_returns_value() {
    util::init_tracing();
    let value = Execution::new(|| Ok::<_, BoxError>("ok".to_string()))
        .run()
        .unwrap();
    assert_eq!(value, "ok");
}

#[test]
fn test_retry_exhaustion_surfaces_last_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&calls);

    let start = Instant::now();
    let result = Execution::new(move || {
        let attempt = seen.fetch_add(1, Ordering::SeqCst) + 1;
        Err::<(), _>(BoxError::from(format!("boom {attempt}")))
    })
    .retry(3, 10)
    .run();

    let err = result.unwrap_err();
    assert!(matches!(err, ExecutionError::Task(_)));
    assert!(err.to_string().contains("boom 3"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // Two inter-attempt delays of 10ms each.
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn test_fallback_converts_last_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&calls);
    let fallback_calls = Arc::new(AtomicU32::new(0));
    let fallback_seen = Arc::clone(&fallback_calls);

    let value = Execution::new(move || {
        seen.fetch_add(1, Ordering::SeqCst);
        Err::<String, _>(BoxError::from("always failing"))
    })
    .retry(3, 0)
    .on_failure(move |err| {
        fallback_seen.fetch_add(1, Ordering::SeqCst);
        assert!(err.to_string().contains("always failing"));
        "fb".to_string()
    })
    .run()
    .unwrap();

    assert_eq!(value, "fb");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fallback_not_invoked_on_success() {
    let value = Execution::new(|| Ok::<_, BoxError>(5))
        .on_failure(|_| panic!("fallback must not run on success"))
        .run()
        .unwrap();
    assert_eq!(value, 5);
}

#[test]
fn test_retry_clamping_runs_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&calls);
    let result = Execution::new(move || {
        seen.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(BoxError::from("nope"))
    })
    .retry(0, 0)
    .run();
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_time_limit_applies_per_attempt() {
    let start = Instant::now();
    let result = Execution::new(|| {
        thread::sleep(Duration::from_millis(500));
        Ok::<_, BoxError>(())
    })
    .retry(2, 0)
    .time_limit(100)
    .run();

    let err = result.unwrap_err();
    assert!(err.is_timed_out());
    let elapsed = start.elapsed();
    // Two attempts, each bounded by the 100ms deadline.
    assert!(elapsed >= Duration::from_millis(190), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(600), "elapsed {elapsed:?}");
}

#[test]
fn test_deadline_dominates_interrupt_aware_task() {
    let start = Instant::now();
    let result = Execution::new(|| {
        if cancel::sleep(Duration::from_secs(10)) {
            Ok(())
        } else {
            Err(BoxError::from("interrupted"))
        }
    })
    .time_limit(100)
    .run();

    assert!(result.unwrap_err().is_timed_out());
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_zero_time_limit_means_no_deadline() {
    let value = Execution::new(|| {
        thread::sleep(Duration::from_millis(50));
        Ok::<_, BoxError>("slow but fine")
    })
    .time_limit(0)
    .run()
    .unwrap();
    assert_eq!(value, "slow but fine");
}

#[test]
fn test_timed_out_attempts_are_retried_to_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&calls);
    let value = Execution::new(move || {
        let attempt = seen.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == 1 {
            thread::sleep(Duration::from_millis(300));
        }
        Ok::<_, BoxError>(attempt)
    })
    .retry(2, 0)
    .time_limit(100)
    .run()
    .unwrap();
    // The first attempt times out, the second completes.
    assert_eq!(value, 2);
}

#[test]
fn test_panicking_task_surfaces_as_task_failure() {
    let result = Execution::new(|| -> Result<(), BoxError> { panic!("task blew up") }).run();
    let err = result.unwrap_err();
    assert!(matches!(err, ExecutionError::Task(_)));
    assert!(err.to_string().contains("panicked"));
}
