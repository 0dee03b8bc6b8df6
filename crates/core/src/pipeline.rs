//! Storage-event dispatch
//!
//! Guard first, then the batch processor over admitted events only. A
//! self-generated event never reaches the operation.

use std::fmt;
use std::future::Future;

use changecast_common::ErrorClassification;
use changecast_domain::{StorageEvent, WorkItem};
use tracing::{info, instrument};

use crate::batch::{BatchReport, ConcurrentBatchProcessor};
use crate::event_guard::EventGuard;

#[instrument(skip_all, fields(events = events.len()))]
pub async fn dispatch_storage_events<T, E, F, Fut>(
    events: Vec<StorageEvent>,
    guard: &EventGuard,
    processor: &ConcurrentBatchProcessor,
    op: F,
) -> BatchReport<T>
where
    T: Send + 'static,
    E: ErrorClassification + fmt::Display + Send + 'static,
    F: Fn(StorageEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let received = events.len();
    let admitted = guard.admit(events, processor.summary());
    info!(received, admitted = admitted.len(), "storage events screened");

    let items = admitted.into_iter().map(|event| WorkItem::new(event.key.clone(), event)).collect();
    processor.process(items, op).await
}
