//! Rate-limited, retried provider calls
//!
//! Every external call goes through the shared [`RateLimiter`] first and is
//! wrapped in a [`RetryExecutor`]. Because the permit is taken inside the
//! retried closure, each retry attempt consumes its own permit.
//! [`cancellable_call`] is for operations that take their own permits.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use changecast_common::resilience::{RateLimiter, RetryExecutor, RetryOutcome, RetryPolicy};
use changecast_common::{CommonError, ErrorClassification, ErrorSeverity};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Failure of one rate-limited attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError<E> {
    /// The limiter was stopped while waiting for a permit
    #[error("Rate limiter unavailable: {0}")]
    Limiter(CommonError),

    /// Cancellation fired while waiting for a permit; the call was not made
    #[error("Interrupted by cancellation before the call was made")]
    Interrupted,

    /// The provider call itself failed
    #[error("{0}")]
    Provider(E),
}

impl<E> CallError<E> {
    /// Whether the underlying call was never issued
    pub fn call_skipped(&self) -> bool {
        matches!(self, Self::Limiter(_) | Self::Interrupted)
    }

    /// The provider error, if the call was made
    pub fn provider(&self) -> Option<&E> {
        match self {
            Self::Provider(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: ErrorClassification> ErrorClassification for CallError<E> {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::Limiter(_) | Self::Interrupted => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Provider(e) => e.severity(),
            Self::Limiter(e) => e.severity(),
            Self::Interrupted => ErrorSeverity::Info,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_critical())
    }

    fn retry_after(&self) -> Option<Duration> {
        self.provider().and_then(ErrorClassification::retry_after)
    }
}

/// Wait for a permit, then run `op`, retrying per `executor`.
pub async fn limited_call<P, F, Fut, T, E>(
    limiter: &RateLimiter,
    executor: &RetryExecutor<P>,
    mut op: F,
) -> RetryOutcome<T, CallError<E>>
where
    P: RetryPolicy<CallError<E>>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    executor
        .execute_with_outcome(|| {
            let call = op();
            async move {
                limiter.wait().await.map_err(CallError::Limiter)?;
                call.await.map_err(CallError::Provider)
            }
        })
        .await
}

/// Like [`limited_call`] but gives up waiting for a permit when `cancel`
/// fires, reporting [`CallError::Interrupted`].
pub async fn limited_call_with_cancel<P, F, Fut, T, E>(
    limiter: &RateLimiter,
    executor: &RetryExecutor<P>,
    cancel: &CancellationToken,
    mut op: F,
) -> RetryOutcome<T, CallError<E>>
where
    P: RetryPolicy<CallError<E>>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    executor
        .execute_with_outcome(|| {
            let call = op();
            async move {
                if !limiter.wait_or_cancel(cancel).await.map_err(CallError::Limiter)? {
                    return Err(CallError::Interrupted);
                }
                call.await.map_err(CallError::Provider)
            }
        })
        .await
}

/// Run `op` under `executor` without taking a permit.
///
/// An attempt that would start after `cancel` fired is not made and reports
/// [`CallError::Interrupted`].
pub async fn cancellable_call<P, F, Fut, T, E>(
    executor: &RetryExecutor<P>,
    cancel: &CancellationToken,
    mut op: F,
) -> RetryOutcome<T, CallError<E>>
where
    P: RetryPolicy<CallError<E>>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    executor
        .execute_with_outcome(|| {
            let call = if cancel.is_cancelled() { None } else { Some(op()) };
            async move {
                match call {
                    Some(call) => call.await.map_err(CallError::Provider),
                    None => Err(CallError::Interrupted),
                }
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use changecast_common::resilience::{policies::ClassifiedRetry, RetryConfig, RetryError};

    use super::*;
    use crate::errors::ProviderError;

    fn executor() -> RetryExecutor<ClassifiedRetry> {
        let config = RetryConfig::builder()
            .max_attempts(3)
            .fixed_backoff(Duration::from_millis(10))
            .no_jitter()
            .build()
            .unwrap();
        RetryExecutor::new(config, ClassifiedRetry)
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_takes_a_permit() {
        let limiter = RateLimiter::new(10).unwrap();
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let outcome = limited_call(&limiter, &executor(), || async move {
            if calls_ref.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ProviderError::from_status(503, "busy"))
            } else {
                Ok(())
            }
        })
        .await;

        assert!(outcome.result.is_ok());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(limiter.available_permits(), 8);
        limiter.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_limiter_is_not_retried() {
        let limiter = RateLimiter::new(1).unwrap();
        limiter.stop();

        let outcome =
            limited_call(&limiter, &executor(), || async { Ok::<_, ProviderError>(()) }).await;

        assert_eq!(outcome.attempts, 1);
        match outcome.result {
            Err(RetryError::NonRetryable { source }) => assert!(source.call_skipped()),
            other => panic!("expected NonRetryable, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_is_interrupted() {
        let limiter = RateLimiter::new(1).unwrap();
        limiter.wait().await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = limited_call_with_cancel(&limiter, &executor(), &cancel, || async {
            Ok::<_, ProviderError>(())
        })
        .await;

        assert!(matches!(
            outcome.result,
            Err(RetryError::NonRetryable { source: CallError::Interrupted })
        ));
        limiter.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_call_takes_no_permit() {
        let limiter = RateLimiter::new(5).unwrap();
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let outcome = cancellable_call(&executor(), &cancel, || async move {
            if calls_ref.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ProviderError::from_status(503, "busy"))
            } else {
                Ok(())
            }
        })
        .await;

        assert!(outcome.result.is_ok());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(limiter.available_permits(), 5);

        cancel.cancel();
        let outcome =
            cancellable_call(&executor(), &cancel, || async { Ok::<_, ProviderError>(()) }).await;
        assert!(matches!(
            outcome.result,
            Err(RetryError::NonRetryable { source: CallError::Interrupted })
        ));
        limiter.stop();
    }

    #[test]
    fn test_classification_delegates_to_provider() {
        let err: CallError<ProviderError> = CallError::Provider(ProviderError::throttled(Some(
            Duration::from_secs(1),
        )));
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(1)));

        let skipped: CallError<ProviderError> = CallError::Interrupted;
        assert!(!skipped.is_retryable());
        assert_eq!(skipped.severity(), ErrorSeverity::Info);
    }
}
