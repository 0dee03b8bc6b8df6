//! Integration tests for the concurrent batch processor and the execution
//! summary it feeds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use changecast_common::{RateLimiter, RetryConfig};
use changecast_core::{BatchConfig, ConcurrentBatchProcessor, ExecutionSummary, ProviderError};
use changecast_domain::{BatchStatus, ItemOutcome, WorkItem};
use tokio_util::sync::CancellationToken;

fn items(n: u32) -> Vec<WorkItem<u32>> {
    (0..n).map(|i| WorkItem::new(format!("item-{i}"), i)).collect()
}

fn quick_retry() -> RetryConfig {
    RetryConfig::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(10))
        .no_jitter()
        .build()
        .unwrap()
}

fn processor(workers: usize, limiter: &Arc<RateLimiter>) -> ConcurrentBatchProcessor {
    let config = BatchConfig::new(workers).unwrap().with_retry(quick_retry());
    ConcurrentBatchProcessor::new(config, Arc::clone(limiter), ExecutionSummary::shared())
}

/// Validates the N-results guarantee and the worker bound.
///
/// Assertions:
/// - 25 items through 4 workers yield 25 results in submission order.
/// - No more than 4 operations ever ran at once.
#[tokio::test(start_paused = true)]
async fn test_returns_one_result_per_item_with_bounded_workers() {
    let limiter = Arc::new(RateLimiter::new(1000).unwrap());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let (in_flight_op, peak_op) = (Arc::clone(&in_flight), Arc::clone(&peak));
    let report = processor(4, &limiter)
        .process(items(25), move |n| {
            let in_flight = Arc::clone(&in_flight_op);
            let peak = Arc::clone(&peak_op);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ProviderError>(n * 2)
            }
        })
        .await;

    assert_eq!(report.len(), 25);
    assert_eq!(report.succeeded(), 25);
    assert_eq!(report.status(), BatchStatus::Succeeded);
    for (index, result) in report.results().iter().enumerate() {
        assert_eq!(result.index, index);
        assert_eq!(result.value(), Some(&(index as u32 * 2)));
    }
    assert!(peak.load(Ordering::SeqCst) <= 4);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    limiter.stop();
}

/// Validates partial failure reporting.
///
/// Assertions:
/// - 10 items with 3 permanent failures give 7 successes and 3 failures.
/// - Permanent failures are attempted once and marked non-retryable.
/// - The batch status is `Degraded` and the summary agrees.
#[tokio::test(start_paused = true)]
async fn test_permanent_failures_degrade_batch() {
    let limiter = Arc::new(RateLimiter::new(100).unwrap());
    let processor = processor(3, &limiter);

    let report = processor
        .process(items(10), |n| async move {
            if matches!(n, 2 | 5 | 8) {
                Err(ProviderError::Validation(format!("record {n} rejected")))
            } else {
                Ok(n)
            }
        })
        .await;

    assert_eq!(report.len(), 10);
    assert_eq!(report.succeeded(), 7);
    assert_eq!(report.failed(), 3);
    assert_eq!(report.status(), BatchStatus::Degraded);
    assert_eq!(
        report.errors(),
        vec![
            ("item-2", "Validation failed: record 2 rejected"),
            ("item-5", "Validation failed: record 5 rejected"),
            ("item-8", "Validation failed: record 8 rejected"),
        ]
    );
    for failed in report.results().iter().filter(|r| r.is_failure()) {
        assert!(matches!(failed.outcome, ItemOutcome::Failed { retryable: false, attempts: 1, .. }));
    }

    let summary = Arc::clone(processor.summary());
    drop(processor);
    let snapshot = summary.finish().unwrap();
    assert_eq!(snapshot.items_succeeded, 7);
    assert_eq!(snapshot.permanent_failures, 3);
    assert_eq!(snapshot.retryable_failures, 0);
    assert_eq!(snapshot.retries, 0);
    limiter.stop();
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let limiter = Arc::new(RateLimiter::new(100).unwrap());
    let processor = processor(2, &limiter);
    let calls: Arc<Mutex<HashMap<u32, u32>>> = Arc::default();

    let calls_op = Arc::clone(&calls);
    let report = processor
        .process(items(4), move |n| {
            let calls = Arc::clone(&calls_op);
            async move {
                let attempt = {
                    let mut calls = calls.lock().unwrap();
                    let count = calls.entry(n).or_insert(0);
                    *count += 1;
                    *count
                };
                match n {
                    // fails once, then succeeds
                    1 if attempt == 1 => Err(ProviderError::from_status(503, "busy")),
                    // never recovers
                    3 => Err(ProviderError::throttled(None)),
                    _ => Ok(n),
                }
            }
        })
        .await;

    assert_eq!(report.succeeded(), 3);
    assert!(matches!(report.results()[1].outcome, ItemOutcome::Succeeded { attempts: 2, .. }));
    assert!(matches!(
        report.results()[3].outcome,
        ItemOutcome::Failed { retryable: true, attempts: 3, .. }
    ));

    let summary = Arc::clone(processor.summary());
    drop(processor);
    let snapshot = summary.finish().unwrap();
    assert_eq!(snapshot.retries, 1 + 2);
    assert_eq!(snapshot.retryable_failures, 1);
    limiter.stop();
}

/// Validates deadline cancellation.
///
/// Assertions:
/// - The in-flight item finishes; queued items are reported not attempted.
/// - The report is flagged cancelled and still has one result per item.
#[tokio::test(start_paused = true)]
async fn test_deadline_stops_claiming_new_items() {
    let limiter = Arc::new(RateLimiter::new(100).unwrap());
    let config = BatchConfig::new(1)
        .unwrap()
        .with_retry(quick_retry())
        .with_deadline(Duration::from_millis(2500));
    let summary = ExecutionSummary::shared();
    let processor = ConcurrentBatchProcessor::new(config, Arc::clone(&limiter), Arc::clone(&summary));

    let report = processor
        .process(items(5), |n| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, ProviderError>(n)
        })
        .await;

    assert!(report.was_cancelled());
    assert_eq!(report.len(), 5);
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.not_attempted(), 2);
    assert_eq!(report.status(), BatchStatus::Degraded);

    drop(processor);
    let snapshot = summary.finish().unwrap();
    assert_eq!(snapshot.not_attempted, 2);
    limiter.stop();
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_attempts_nothing() {
    let limiter = Arc::new(RateLimiter::new(100).unwrap());
    let calls = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let calls_op = Arc::clone(&calls);
    let report = processor(2, &limiter)
        .process_with_cancel(
            items(5),
            move |n| {
                calls_op.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, ProviderError>(n) }
            },
            cancel,
        )
        .await;

    assert_eq!(report.not_attempted(), 5);
    assert_eq!(report.status(), BatchStatus::Failed);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    limiter.stop();
}

#[tokio::test(start_paused = true)]
async fn test_stopped_limiter_reports_items_not_attempted() {
    let limiter = Arc::new(RateLimiter::new(5).unwrap());
    limiter.stop();

    let report =
        processor(2, &limiter).process(items(3), |n| async move { Ok::<_, ProviderError>(n) }).await;

    assert_eq!(report.len(), 3);
    assert_eq!(report.not_attempted(), 3);
}

/// A panicking worker loses only the item it held.
#[tokio::test(start_paused = true)]
async fn test_worker_panic_keeps_result_count() {
    let limiter = Arc::new(RateLimiter::new(100).unwrap());

    let report = processor(2, &limiter)
        .process(items(6), |n| async move {
            if n == 1 {
                panic!("provider client bug");
            }
            Ok::<_, ProviderError>(n)
        })
        .await;

    assert_eq!(report.len(), 6);
    assert_eq!(report.succeeded(), 5);
    assert_eq!(report.errors(), vec![("item-1", "worker panicked")]);
    limiter.stop();
}

/// Validates that a panic never stops a lone worker.
///
/// Assertions:
/// - With one worker and a panicking first item, every later item succeeds.
/// - The summary records exactly one permanent failure.
#[tokio::test(start_paused = true)]
async fn test_single_worker_survives_panicking_item() {
    let limiter = Arc::new(RateLimiter::new(100).unwrap());
    let processor = processor(1, &limiter);

    let report = processor
        .process(items(4), |n| async move {
            if n == 0 {
                panic!("malformed record");
            }
            Ok::<_, ProviderError>(n)
        })
        .await;

    assert_eq!(report.len(), 4);
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.not_attempted(), 0);
    assert_eq!(report.errors(), vec![("item-0", "worker panicked")]);
    assert!(matches!(
        report.results()[0].outcome,
        ItemOutcome::Failed { retryable: false, attempts: 1, .. }
    ));

    let summary = Arc::clone(processor.summary());
    drop(processor);
    let snapshot = summary.finish().unwrap();
    assert_eq!(snapshot.permanent_failures, 1);
    assert_eq!(snapshot.items_succeeded, 3);
    limiter.stop();
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch() {
    let limiter = Arc::new(RateLimiter::new(5).unwrap());
    let report = processor(4, &limiter)
        .process(Vec::<WorkItem<u32>>::new(), |n| async move { Ok::<_, ProviderError>(n) })
        .await;

    assert!(report.is_empty());
    assert_eq!(report.status(), BatchStatus::Succeeded);
    limiter.stop();
}

/// Validates that concurrent recording loses no updates.
///
/// Assertions:
/// - K tasks each recording M successes yield exactly K×M.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_summary_updates_are_exact() {
    const TASKS: usize = 8;
    const INCREMENTS: usize = 1_000;

    let summary = ExecutionSummary::shared();
    let mut handles = Vec::new();
    for task in 0..TASKS {
        let summary = Arc::clone(&summary);
        handles.push(tokio::spawn(async move {
            for i in 0..INCREMENTS {
                summary.record_item_succeeded();
                summary.record_customer_processed(&format!("customer-{}", (task + i) % 10));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let snapshot = summary.finish().unwrap();
    assert_eq!(snapshot.items_succeeded, (TASKS * INCREMENTS) as u64);
    assert_eq!(snapshot.processed_customers.len(), 10);
}
