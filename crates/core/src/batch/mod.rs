//! Bounded concurrent batch processing
//!
//! A [`ConcurrentBatchProcessor`] runs `min(workers, items)` Tokio tasks that
//! pull from a shared queue until it is empty or the batch is cancelled.
//! Every attempt takes a rate-limiter permit and is retried per the batch's
//! [`RetryConfig`]. Operations that make several external calls take their
//! own permits instead; see [`BatchConfig::self_limited`]. One item's failure never aborts the others: the
//! caller always gets exactly one result per item.

pub mod processor;
pub mod report;

use std::time::Duration;

use changecast_common::{CommonError, CommonResult, RetryConfig};

pub use processor::ConcurrentBatchProcessor;
pub use report::BatchReport;

/// Batch-wide settings
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Upper bound on live workers
    pub workers: usize,
    /// Deadline for the whole batch, measured from the start of `process`
    pub deadline: Option<Duration>,
    /// Per-item retry behaviour
    pub retry: RetryConfig,
    /// The operation takes a limiter permit before each of its own external
    /// calls, so the processor takes none per attempt
    pub self_limited: bool,
}

impl BatchConfig {
    /// Validated config with default retries and no deadline.
    pub fn new(workers: usize) -> CommonResult<Self> {
        let config =
            Self { workers, deadline: None, retry: RetryConfig::default(), self_limited: false };
        config.validate()?;
        Ok(config)
    }

    /// Cancel the batch `deadline` after it starts.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Replace the per-item retry behaviour.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Mark the operation as rate limiting itself.
    ///
    /// Use for operations that make more than one external call per attempt,
    /// such as [`IdempotencyReconciler::reconcile`] built
    /// [`with_rate_limiter`] on the same limiter.
    ///
    /// [`IdempotencyReconciler::reconcile`]: crate::reconcile::IdempotencyReconciler::reconcile
    /// [`with_rate_limiter`]: crate::reconcile::IdempotencyReconciler::with_rate_limiter
    #[must_use]
    pub fn self_limited(mut self) -> Self {
        self.self_limited = true;
        self
    }

    /// Reject zero workers, a zero deadline and invalid retry settings.
    pub fn validate(&self) -> CommonResult<()> {
        if self.workers == 0 {
            return Err(CommonError::config_field("workers", "must be greater than 0"));
        }
        if self.deadline.is_some_and(|d| d.is_zero()) {
            return Err(CommonError::config_field("deadline", "must be greater than zero"));
        }
        self.retry.validate()
    }
}
