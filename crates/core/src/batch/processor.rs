//! Worker pool over a shared queue
//!
//! Each claimed item runs in its own task and the worker joins it, so a
//! panicking operation loses only that item and the worker moves on.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use changecast_common::policies::ClassifiedRetry;
use changecast_common::{ErrorClassification, RateLimiter, RetryConfig, RetryExecutor};
use changecast_domain::{ItemOutcome, ItemResult, WorkItem};
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::{BatchConfig, BatchReport};
use crate::call::{cancellable_call, limited_call_with_cancel};
use crate::summary::ExecutionSummary;

/// Runs an async operation over a batch of items with bounded concurrency
///
/// The limiter and summary are shared with the caller, who owns their
/// lifecycle: stop the limiter and finish the summary after `process`
/// returns.
pub struct ConcurrentBatchProcessor {
    config: BatchConfig,
    limiter: Arc<RateLimiter>,
    summary: Arc<ExecutionSummary>,
}

struct BatchState<P, T, F> {
    queue: Mutex<VecDeque<(usize, WorkItem<P>)>>,
    slots: Mutex<Vec<Option<ItemResult<T>>>>,
    op: F,
    limiter: Arc<RateLimiter>,
    summary: Arc<ExecutionSummary>,
    retry: RetryConfig,
    self_limited: bool,
    cancel: CancellationToken,
}

const PANICKED: &str = "worker panicked";

impl ConcurrentBatchProcessor {
    /// Create a processor sharing `limiter` and `summary` with the caller.
    pub fn new(
        config: BatchConfig,
        limiter: Arc<RateLimiter>,
        summary: Arc<ExecutionSummary>,
    ) -> Self {
        Self { config, limiter, summary }
    }

    /// Settings this processor was built with.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// The summary every item outcome is recorded into.
    pub fn summary(&self) -> &Arc<ExecutionSummary> {
        &self.summary
    }

    /// Process `items` with no external cancellation besides the configured
    /// deadline.
    pub async fn process<P, T, E, F, Fut>(&self, items: Vec<WorkItem<P>>, op: F) -> BatchReport<T>
    where
        P: Clone + Send + 'static,
        T: Send + 'static,
        E: ErrorClassification + fmt::Display + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.process_with_cancel(items, op, CancellationToken::new()).await
    }

    /// Process `items`, stopping early when `cancel` fires or the deadline
    /// passes.
    ///
    /// On cancellation a worker finishes the call it is making, then stops
    /// claiming items; whatever is still queued is reported as not
    /// attempted. Returns only after every worker task has been joined.
    #[instrument(skip_all, fields(items = items.len(), workers = self.config.workers))]
    pub async fn process_with_cancel<P, T, E, F, Fut>(
        &self,
        items: Vec<WorkItem<P>>,
        op: F,
        cancel: CancellationToken,
    ) -> BatchReport<T>
    where
        P: Clone + Send + 'static,
        T: Send + 'static,
        E: ErrorClassification + fmt::Display + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let started = Instant::now();
        let total = items.len();
        if total == 0 {
            return BatchReport::new(Vec::new(), false, started.elapsed());
        }

        let cancel = cancel.child_token();
        let item_ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        let state = Arc::new(BatchState {
            queue: Mutex::new(items.into_iter().enumerate().collect()),
            slots: Mutex::new((0..total).map(|_| None).collect()),
            op,
            limiter: Arc::clone(&self.limiter),
            summary: Arc::clone(&self.summary),
            retry: self.config.retry.clone(),
            self_limited: self.config.self_limited,
            cancel: cancel.clone(),
        });

        let deadline_task = self.config.deadline.map(|deadline| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(deadline) => {
                        warn!(?deadline, "batch deadline reached, cancelling");
                        cancel.cancel();
                    }
                }
            })
        });

        let worker_count = self.config.workers.min(total);
        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            workers.spawn(run_worker(worker_id, Arc::clone(&state)));
        }
        debug!(worker_count, "batch workers spawned");

        while let Some(joined) = workers.join_next().await {
            if let Err(join_error) = joined {
                if join_error.is_panic() {
                    error!(error = %join_error, "batch worker panicked");
                } else {
                    warn!(error = %join_error, "batch worker aborted");
                }
            }
        }

        let cancelled = cancel.is_cancelled();
        if let Some(task) = deadline_task {
            task.abort();
        }

        let results = self.collect_results(&state, &item_ids);
        let report = BatchReport::new(results, cancelled, started.elapsed());

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            not_attempted = report.not_attempted(),
            cancelled,
            status = %report.status(),
            "batch finished"
        );
        report
    }

    /// Fill slots that no worker completed.
    ///
    /// Items still queued were never claimed. An empty slot for a claimed
    /// item means its worker task died outside the item task.
    fn collect_results<P, T, F>(
        &self,
        state: &BatchState<P, T, F>,
        item_ids: &[String],
    ) -> Vec<ItemResult<T>> {
        let leftover: Vec<(usize, WorkItem<P>)> = state.queue.lock().drain(..).collect();
        let mut slots = std::mem::take(&mut *state.slots.lock());

        for (index, item) in leftover {
            self.summary.record_not_attempted();
            slots[index] =
                Some(ItemResult { index, item_id: item.id, outcome: ItemOutcome::NotAttempted });
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    let item_id = item_ids[index].clone();
                    self.summary.record_permanent_failure(&item_id, PANICKED);
                    ItemResult {
                        index,
                        item_id,
                        outcome: ItemOutcome::Failed {
                            error: PANICKED.to_string(),
                            retryable: false,
                            attempts: 0,
                        },
                    }
                })
            })
            .collect()
    }
}

async fn run_worker<P, T, E, F, Fut>(worker_id: usize, state: Arc<BatchState<P, T, F>>)
where
    P: Clone + Send + 'static,
    T: Send + 'static,
    E: ErrorClassification + fmt::Display + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let mut processed = 0_usize;

    loop {
        if state.cancel.is_cancelled() {
            debug!(worker_id, "worker stopping on cancellation");
            break;
        }

        let next = state.queue.lock().pop_front();
        let Some((index, item)) = next else {
            break;
        };

        let item_id = item.id.clone();
        let task = tokio::spawn({
            let state = Arc::clone(&state);
            async move { state.run_item(index, item).await }
        });

        let result = match task.await {
            Ok(result) => result,
            Err(join_error) => {
                let message = if join_error.is_panic() { PANICKED } else { "item task aborted" };
                error!(worker_id, item_id = %item_id, error = %join_error, "item task failed");
                state.summary.record_permanent_failure(&item_id, message);
                ItemResult {
                    index,
                    item_id,
                    outcome: ItemOutcome::Failed {
                        error: message.to_string(),
                        retryable: false,
                        attempts: 1,
                    },
                }
            }
        };
        state.slots.lock()[index] = Some(result);
        processed += 1;
    }

    debug!(worker_id, processed, "worker exited");
}

impl<P, T, F> BatchState<P, T, F> {
    async fn run_item<E, Fut>(&self, index: usize, item: WorkItem<P>) -> ItemResult<T>
    where
        P: Clone + Send + 'static,
        E: ErrorClassification + fmt::Display + Send + 'static,
        F: Fn(P) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let executor =
            RetryExecutor::new(self.retry.clone(), ClassifiedRetry).with_cancellation(self.cancel.clone());
        let op = &self.op;
        let payload = item.payload;

        let call = move || op(payload.clone());
        let outcome = if self.self_limited {
            cancellable_call(&executor, &self.cancel, call).await
        } else {
            limited_call_with_cancel(&self.limiter, &executor, &self.cancel, call).await
        };
        let attempts = outcome.attempts;

        let outcome = match outcome.into_result() {
            Ok(value) => {
                self.summary.record_item_succeeded();
                self.summary.record_retries(attempts.saturating_sub(1));
                ItemOutcome::Succeeded { value, attempts }
            }
            Err(err) => {
                let last = err.last_error();
                // An attempt that never got a permit made no call
                let skipped = last.call_skipped();
                let calls = if skipped { attempts.saturating_sub(1) } else { attempts };
                self.summary.record_retries(calls.saturating_sub(1));

                if calls == 0 {
                    self.summary.record_not_attempted();
                    ItemOutcome::NotAttempted
                } else {
                    let retryable = skipped || last.is_retryable();
                    let message = last.to_string();
                    if retryable {
                        self.summary.record_retryable_failure(&item.id, &message);
                    } else {
                        self.summary.record_permanent_failure(&item.id, &message);
                    }
                    debug!(item_id = %item.id, attempts = calls, retryable, error = %message, "item failed");
                    ItemOutcome::Failed { error: message, retryable, attempts: calls }
                }
            }
        };

        ItemResult { index, item_id: item.id, outcome }
    }
}
