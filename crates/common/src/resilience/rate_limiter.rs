//! Token-bucket rate limiting for quota-limited downstream providers
//!
//! The bucket starts full (`capacity` permits) and a background refill task
//! adds one permit per `refill_interval`, never exceeding capacity. Callers
//! block in [`RateLimiter::wait`] until a permit is available; waiters are
//! served first-come-first-served because the underlying Tokio semaphore is
//! fair.
//!
//! The refill task is owned by the limiter. [`RateLimiter::stop`] halts it and
//! the `Drop` impl calls `stop` as well, so the task is released on every exit
//! path, including early returns and panics unwinding through the owner.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{CommonError, CommonResult};

const LIMITER_TASK: &str = "rate_limiter";

/// Configuration for the token-bucket limiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of permits the bucket can hold (burst size)
    pub capacity: usize,
    /// Time between single-permit refills
    pub refill_interval: Duration,
}

impl RateLimiterConfig {
    /// Burst of `requests_per_second` permits, refilled one every
    /// `1s / requests_per_second`.
    pub fn per_second(requests_per_second: u32) -> CommonResult<Self> {
        if requests_per_second == 0 {
            return Err(CommonError::config_field(
                "requests_per_second",
                "must be greater than 0",
            ));
        }

        let config = Self {
            capacity: requests_per_second as usize,
            refill_interval: Duration::from_secs(1) / requests_per_second,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> CommonResult<()> {
        if self.capacity == 0 {
            return Err(CommonError::config_field("capacity", "must be greater than 0"));
        }
        if self.capacity > Semaphore::MAX_PERMITS {
            return Err(CommonError::config_field("capacity", "exceeds semaphore permit limit"));
        }
        if self.refill_interval.is_zero() {
            return Err(CommonError::config_field(
                "refill_interval",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Token-bucket rate limiter with a background refill task
///
/// Construct one limiter per session or batch and share it by reference (or
/// `Arc`) with every worker that calls the protected provider.
///
/// # Examples
///
/// ```rust,no_run
/// use changecast_common::resilience::RateLimiter;
///
/// # async fn example() -> Result<(), changecast_common::CommonError> {
/// let limiter = RateLimiter::new(5)?;
///
/// for _ in 0..10 {
///     limiter.wait().await?;
///     // call the provider
/// }
///
/// limiter.stop();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
    refill_task: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` calls per second with a
    /// burst of the same size.
    ///
    /// # Errors
    /// Returns `CommonError::Config` for a zero rate or when called outside a
    /// Tokio runtime.
    pub fn new(requests_per_second: u32) -> CommonResult<Self> {
        Self::with_config(RateLimiterConfig::per_second(requests_per_second)?)
    }

    /// Create a limiter from an explicit configuration.
    pub fn with_config(config: RateLimiterConfig) -> CommonResult<Self> {
        config.validate()?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| CommonError::config("rate limiter must be created inside a Tokio runtime"))?;

        let permits = Arc::new(Semaphore::new(config.capacity));
        let shutdown = CancellationToken::new();

        let refill_task = runtime.spawn(refill_loop(
            Arc::clone(&permits),
            config.capacity,
            config.refill_interval,
            shutdown.clone(),
        ));

        debug!(
            capacity = config.capacity,
            refill_interval_ms = config.refill_interval.as_millis() as u64,
            "rate limiter started"
        );

        Ok(Self { config, permits, shutdown, refill_task: Mutex::new(Some(refill_task)) })
    }

    /// Block until a permit is available, then consume it.
    ///
    /// # Errors
    /// Returns `CommonError::TaskCancelled` once the limiter has been stopped.
    pub async fn wait(&self) -> CommonResult<()> {
        let permit = self.permits.acquire().await.map_err(|_| stopped_error())?;
        permit.forget();
        trace!(remaining = self.permits.available_permits(), "rate limiter permit consumed");
        Ok(())
    }

    /// Wait for a permit unless `cancel` fires first.
    ///
    /// Returns `Ok(true)` when a permit was consumed and `Ok(false)` when the
    /// token was cancelled while waiting (no permit consumed).
    pub async fn wait_or_cancel(&self, cancel: &CancellationToken) -> CommonResult<bool> {
        if cancel.is_cancelled() {
            return Ok(false);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Ok(false),
            acquired = self.wait() => acquired.map(|()| true),
        }
    }

    /// Wait for a permit for at most `timeout`.
    ///
    /// # Errors
    /// Returns `CommonError::Timeout` if no permit became available in time.
    pub async fn wait_timeout(&self, timeout: Duration) -> CommonResult<()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| CommonError::timeout("rate limiter permit", timeout))?
    }

    /// Consume a permit if one is available right now.
    pub fn try_acquire(&self) -> bool {
        match self.permits.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    /// Permits currently in the bucket
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Bucket capacity (burst size)
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Interval between single-permit refills
    pub fn refill_interval(&self) -> Duration {
        self.config.refill_interval
    }

    /// Whether [`stop`](Self::stop) has run
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Halt the refill task and fail all current and future waiters.
    ///
    /// Only the first call does the work and returns `true`; later calls
    /// (including the one made by `Drop`) are no-ops returning `false`.
    pub fn stop(&self) -> bool {
        let Some(task) = self.refill_task.lock().take() else {
            return false;
        };

        self.shutdown.cancel();
        self.permits.close();
        // The loop observes the token at its next poll; detach the handle.
        drop(task);

        debug!(capacity = self.config.capacity, "rate limiter stopped");
        true
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn refill_loop(
    permits: Arc<Semaphore>,
    capacity: usize,
    refill_interval: Duration,
    shutdown: CancellationToken,
) {
    // `interval` would tick immediately; the bucket already starts full.
    let mut ticker = tokio::time::interval_at(Instant::now() + refill_interval, refill_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                // This task is the only producer of permits, so the check
                // cannot race past capacity.
                if permits.available_permits() < capacity {
                    permits.add_permits(1);
                }
            }
        }
    }

    trace!("rate limiter refill loop exited");
}

fn stopped_error() -> CommonError {
    CommonError::task_cancelled_with_reason(LIMITER_TASK, "limiter stopped")
}
