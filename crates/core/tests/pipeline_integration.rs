//! Integration tests for event screening, dispatch, directory walks and
//! contact changes.

mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use changecast_common::policies::ClassifiedRetry;
use changecast_common::{RateLimiter, RetryConfig, RetryExecutor};
use changecast_core::{
    apply_contact_change, collect_directory, dispatch_storage_events, BatchConfig,
    ConcurrentBatchProcessor, DirectoryError, EventGuard, EventGuardConfig, ExecutionSummary,
    NoopContactStore, ProviderError,
};
use changecast_domain::{
    Contact, ContactChange, DirectoryPage, EventGuardSettings, StorageEvent, WorkItem,
};
use support::{user, PagedDirectory};

fn quick_retry() -> RetryConfig {
    RetryConfig::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(10))
        .no_jitter()
        .build()
        .unwrap()
}

/// Validates that self-generated events never reach the batch layer.
///
/// Assertions:
/// - Only external keys are handed to the operation.
/// - Each discarded event is counted once in the summary.
#[tokio::test(start_paused = true)]
async fn test_self_generated_events_never_reach_batch() {
    let limiter = Arc::new(RateLimiter::new(50).unwrap());
    let summary = ExecutionSummary::shared();
    let processor = ConcurrentBatchProcessor::new(
        BatchConfig::new(2).unwrap().with_retry(quick_retry()),
        Arc::clone(&limiter),
        Arc::clone(&summary),
    );
    let guard = EventGuard::new(EventGuardConfig::from(&EventGuardSettings::default()));

    let events = vec![
        StorageEvent::new("incoming/customers.csv", "ObjectCreated:Put"),
        StorageEvent::new("processed/customers.csv", "ObjectCreated:Put"),
        StorageEvent::new("incoming/retry.csv", "ObjectCreated:Put")
            .with_metadata("x-amz-meta-changecast-generated", "true"),
        StorageEvent::new("incoming/orders.csv", "ObjectCreated:Copy"),
    ];

    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let seen_op = Arc::clone(&seen);
    let report = dispatch_storage_events(events, &guard, &processor, move |event: StorageEvent| {
        let seen = Arc::clone(&seen_op);
        async move {
            seen.lock().unwrap().push(event.key.clone());
            Ok::<_, ProviderError>(event.event_type)
        }
    })
    .await;

    assert_eq!(report.len(), 2);
    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec!["incoming/customers.csv", "incoming/orders.csv"]);
    assert_eq!(report.results()[1].item_id, "incoming/orders.csv");

    drop(processor);
    let snapshot = summary.finish().unwrap();
    assert_eq!(snapshot.events_discarded, 2);
    assert_eq!(snapshot.items_succeeded, 2);
    limiter.stop();
}

#[tokio::test(start_paused = true)]
async fn test_collect_directory_walks_all_pages() {
    let limiter = RateLimiter::new(10).unwrap();
    let directory = PagedDirectory::new(&[3, 3, 1]);
    let executor = RetryExecutor::new(quick_retry(), ClassifiedRetry);

    let users = collect_directory(&directory, &limiter, &executor).await.unwrap();

    assert_eq!(users.len(), 7);
    assert_eq!(users[6], user(7));
    assert_eq!(directory.requests(), 3);
    assert_eq!(limiter.available_permits(), 7);
    limiter.stop();
}

#[tokio::test(start_paused = true)]
async fn test_collect_directory_retries_transient_page_failure() {
    let limiter = RateLimiter::new(10).unwrap();
    let directory = PagedDirectory::new(&[2, 2]);
    directory.fail_next(ProviderError::throttled(Some(Duration::from_millis(100))));
    let executor = RetryExecutor::new(quick_retry(), ClassifiedRetry);

    let users = collect_directory(&directory, &limiter, &executor).await.unwrap();

    assert_eq!(users.len(), 4);
    assert_eq!(directory.requests(), 3);
    limiter.stop();
}

#[tokio::test(start_paused = true)]
async fn test_collect_directory_rejects_repeated_token() {
    let limiter = RateLimiter::new(10).unwrap();
    let looping = PagedDirectory::from_pages(vec![
        DirectoryPage { users: vec![user(1)], next_page_token: Some("page-1".into()) },
        DirectoryPage { users: vec![user(2)], next_page_token: Some("page-1".into()) },
    ]);
    let executor = RetryExecutor::new(quick_retry(), ClassifiedRetry);

    let err = collect_directory(&looping, &limiter, &executor).await.unwrap_err();
    assert_eq!(err, DirectoryError::RepeatedPageToken { token: "page-1".into() });
    limiter.stop();
}

#[tokio::test(start_paused = true)]
async fn test_collect_directory_surfaces_permanent_error() {
    let limiter = RateLimiter::new(10).unwrap();
    let directory = PagedDirectory::new(&[1]);
    directory.fail_next(ProviderError::from_status(401, "expired credentials"));
    let executor = RetryExecutor::new(quick_retry(), ClassifiedRetry);

    let err = collect_directory(&directory, &limiter, &executor).await.unwrap_err();
    assert_eq!(err, DirectoryError::Provider(ProviderError::Unauthorized("expired credentials".into())));
    assert_eq!(directory.requests(), 1);
    limiter.stop();
}

/// Contact changes applied through the batch, counted per outcome.
#[tokio::test(start_paused = true)]
async fn test_contact_changes_through_batch() {
    let limiter = Arc::new(RateLimiter::new(20).unwrap());
    let summary = ExecutionSummary::shared();
    let processor = ConcurrentBatchProcessor::new(
        BatchConfig::new(3).unwrap().with_retry(quick_retry()),
        Arc::clone(&limiter),
        Arc::clone(&summary),
    );

    let changes: Vec<WorkItem<ContactChange>> = (0..4)
        .map(|i| {
            let change = if i % 2 == 0 {
                ContactChange::Subscribe {
                    list: "release-notes".into(),
                    contact: Contact::new(format!("c{i}@example.com")),
                }
            } else {
                ContactChange::Unsubscribe {
                    list: "release-notes".into(),
                    email: format!("c{i}@example.com"),
                }
            };
            WorkItem::new(format!("contact-{i}"), change)
        })
        .collect();

    let op_summary = Arc::clone(&summary);
    let report = processor
        .process(changes, move |change: ContactChange| {
            let summary = Arc::clone(&op_summary);
            async move {
                let outcome = apply_contact_change(&NoopContactStore, &change).await?;
                summary.record_contact(outcome);
                Ok::<_, ProviderError>(outcome)
            }
        })
        .await;

    assert_eq!(report.succeeded(), 4);
    drop(processor);
    drop(report);

    let snapshot = summary.finish().unwrap();
    assert_eq!(snapshot.contacts_created, 2);
    assert_eq!(snapshot.contacts_deleted, 2);
    limiter.stop();
}
