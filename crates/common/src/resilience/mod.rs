//! Resilience patterns for quota-limited, failure-prone providers
//!
//! - **Rate limiting**: a token bucket bounding the outbound call rate
//! - **Retry logic**: bounded retries with exponential backoff and jitter,
//!   driven by error classification
//!
//! Both are generic over the work they protect and know nothing about
//! directories, calendars or storage events. Domain crates compose them.

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use retry::{
    policies, retry_with_policy, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder,
    RetryDecision, RetryError, RetryExecutor, RetryOutcome, RetryPolicy, RetryResult,
};
