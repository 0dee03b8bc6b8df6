//! Retry execution with classified failures, bounded attempts and backoff
//!
//! [`RetryExecutor`] runs a unit of work until it succeeds, the
//! [`RetryPolicy`] declares the failure permanent, attempts run out, the
//! total-time budget is spent, or an attached cancellation token fires. Every
//! failure variant of [`RetryError`] carries the final underlying error so a
//! caller can always report what actually went wrong.
//!
//! The executor does not make the operation idempotent. Work that creates
//! external resources must reconcile before writing so that a retry never
//! duplicates a side effect.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::{CommonError, CommonResult, ErrorClassification};

/// Terminal failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The policy classified the failure as permanent
    #[error("Operation failed with non-retryable error: {source}")]
    NonRetryable { source: E },

    /// All retry attempts have been exhausted
    #[error("All retry attempts exhausted after {attempts} tries: {last}")]
    AttemptsExhausted { attempts: u32, last: E },

    /// The next backoff would exceed the total-time budget
    #[error("Retry timeout exceeded after {elapsed:?}: {last}")]
    TimeoutExceeded { elapsed: Duration, last: E },

    /// The cancellation token fired while waiting to retry
    #[error("Retry cancelled after {attempts} tries: {last}")]
    Cancelled { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    /// Borrow the final underlying error
    pub fn last_error(&self) -> &E {
        match self {
            Self::NonRetryable { source } => source,
            Self::AttemptsExhausted { last, .. }
            | Self::TimeoutExceeded { last, .. }
            | Self::Cancelled { last, .. } => last,
        }
    }

    /// Consume the retry error and return the final underlying error
    pub fn into_last_error(self) -> E {
        match self {
            Self::NonRetryable { source } => source,
            Self::AttemptsExhausted { last, .. }
            | Self::TimeoutExceeded { last, .. }
            | Self::Cancelled { last, .. } => last,
        }
    }

    /// Whether the final error was judged permanent by the policy
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::NonRetryable { .. })
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Outcome of a retry execution including result and summary statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    /// Number of times the operation was invoked
    pub attempts: u32,
    /// Sum of all backoff sleeps actually taken
    pub total_delay: Duration,
    started: Instant,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    /// Retries performed (attempts beyond the first)
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    /// Elapsed time since the first attempt started.
    pub fn total_elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Decide what to do after `error` on zero-based `attempt`
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the default backoff delay
    Retry,
    /// Retry the operation after the given delay (e.g. a Retry-After hint)
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: `initial_delay * base^attempt`, capped at `max_delay`
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Calculate the delay before retrying after zero-based `attempt`
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let secs = initial_delay.as_secs_f64() * base.powi(exponent);
                Duration::try_from_secs_f64(secs).map_or(*max_delay, |d| d.min(*max_delay))
            }
        }
    }
}

/// Jitter applied on top of the backoff delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// No jitter
    None,
    /// Uniform in `0..=delay`
    Full,
    /// Uniform in `delay/2..=delay`
    Equal,
}

impl Jitter {
    /// Apply jitter to the calculated delay
    pub fn apply(&self, delay: Duration) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(rand::thread_rng().gen_range(0..=millis)),
            Self::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + rand::thread_rng().gen_range(0..=millis - half))
            }
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
    /// Jitter type for randomizing delays
    pub jitter: Jitter,
    /// Maximum total time to spend retrying
    pub max_total_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(200),
                base: 2.0,
                max_delay: Duration::from_secs(10),
            },
            jitter: Jitter::Equal,
            max_total_time: Some(Duration::from_secs(120)),
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> CommonResult<()> {
        if self.max_attempts == 0 {
            return Err(CommonError::config_field("max_attempts", "must be greater than 0"));
        }

        if let BackoffStrategy::Exponential { base, initial_delay, max_delay } = &self.backoff {
            if !base.is_finite() || *base < 1.0 {
                return Err(CommonError::config_field("backoff.base", "must be at least 1.0"));
            }
            if initial_delay > max_delay {
                return Err(CommonError::config_field(
                    "backoff.initial_delay",
                    "must not exceed max_delay",
                ));
            }
        }

        if self.max_total_time.is_some_and(|t| t.is_zero()) {
            return Err(CommonError::config_field("max_total_time", "must be greater than zero"));
        }

        Ok(())
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, base, max_delay };
        self
    }

    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.config.jitter = jitter;
        self
    }

    pub fn no_jitter(self) -> Self {
        self.jitter(Jitter::None)
    }

    pub fn max_total_time(mut self, duration: Duration) -> Self {
        self.config.max_total_time = Some(duration);
        self
    }

    pub fn unlimited_time(mut self) -> Self {
        self.config.max_total_time = None;
        self
    }

    pub fn build(self) -> CommonResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Runs an operation under a [`RetryConfig`] and [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
    cancel: Option<CancellationToken>,
}

impl<P> RetryExecutor<P> {
    /// Create a new retry executor with the given configuration and policy
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy, cancel: None }
    }

    /// Create with default configuration
    pub fn with_policy(policy: P) -> Self {
        Self::new(RetryConfig::default(), policy)
    }

    /// Abort backoff sleeps when `token` fires.
    ///
    /// An attempt already running is never interrupted; the executor stops
    /// before the next one and returns [`RetryError::Cancelled`].
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    #[instrument(skip(self, operation), fields(max_attempts = self.config.max_attempts))]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics.
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let mut total_delay = Duration::ZERO;
        let mut attempt: u32 = 0;

        let result = loop {
            let attempt_number = attempt + 1;
            debug!(attempt = attempt_number, max = self.config.max_attempts, "executing operation");

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "operation succeeded after retries");
                    }
                    break Ok(value);
                }
                Err(error) => error,
            };

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(attempt = attempt_number, error = %error, "failure is not retryable");
                    break Err(RetryError::NonRetryable { source: error });
                }
                _ if attempt_number >= self.config.max_attempts => {
                    debug!(attempts = attempt_number, error = %error, "retry attempts exhausted");
                    break Err(RetryError::AttemptsExhausted { attempts: attempt_number, last: error });
                }
                RetryDecision::Retry => {
                    self.config.jitter.apply(self.config.backoff.calculate_delay(attempt))
                }
                RetryDecision::RetryAfter(delay) => delay,
            };

            let elapsed = started.elapsed();
            if let Some(max_time) = self.config.max_total_time {
                if elapsed + delay > max_time {
                    debug!(?elapsed, ?delay, error = %error, "retry time budget exceeded");
                    break Err(RetryError::TimeoutExceeded { elapsed, last: error });
                }
            }

            debug!(attempt = attempt_number, ?delay, error = %error, "operation failed, retrying");

            if !self.backoff(delay).await {
                debug!(attempts = attempt_number, "retry cancelled during backoff");
                break Err(RetryError::Cancelled { attempts: attempt_number, last: error });
            }

            total_delay += delay;
            attempt += 1;
        };

        RetryOutcome { result, attempts: attempt + 1, total_delay, started }
    }

    /// Sleep for `delay`; returns `false` if cancelled first.
    async fn backoff(&self, delay: Duration) -> bool {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => false,
                () = tokio::time::sleep(delay) => true,
            },
            None => {
                tokio::time::sleep(delay).await;
                true
            }
        }
    }
}

/// Convenience function to create a retry executor and execute an operation
pub async fn retry_with_policy<F, Fut, T, E, P>(
    config: RetryConfig,
    policy: P,
    operation: F,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: RetryPolicy<E>,
    E: fmt::Display,
{
    RetryExecutor::new(config, policy).execute(operation).await
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::{ErrorClassification, RetryDecision, RetryPolicy};

    /// Always retry policy - retries on any error
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retry policy - never retries
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug, Clone)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }

    /// Retries exactly the errors that classify themselves as retryable,
    /// honouring their `retry_after` hint when present.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ClassifiedRetry;

    impl<E: ErrorClassification> RetryPolicy<E> for ClassifiedRetry {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if !error.is_retryable() {
                return RetryDecision::Stop;
            }
            error.retry_after().map_or(RetryDecision::Retry, RetryDecision::RetryAfter)
        }
    }
}
