//! Conversions from configuration sections to component configs

use std::time::Duration;

use changecast_common::{
    BackoffStrategy, CommonError, CommonResult, Jitter, RateLimiter, RetryConfig,
};
use changecast_domain::{BatchSettings, JitterMode, RateLimitSettings, RetrySettings};

use crate::batch::BatchConfig;

pub trait RetrySettingsExt {
    fn to_retry_config(&self) -> CommonResult<RetryConfig>;
}

impl RetrySettingsExt for RetrySettings {
    fn to_retry_config(&self) -> CommonResult<RetryConfig> {
        let config = RetryConfig {
            max_attempts: self.max_attempts,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(self.initial_delay_ms),
                base: self.backoff_base,
                max_delay: Duration::from_millis(self.max_delay_ms),
            },
            jitter: jitter_from_mode(self.jitter),
            max_total_time: self.max_total_secs.map(Duration::from_secs),
        };
        config.validate()?;
        Ok(config)
    }
}

fn jitter_from_mode(mode: JitterMode) -> Jitter {
    match mode {
        JitterMode::None => Jitter::None,
        JitterMode::Full => Jitter::Full,
        JitterMode::Equal => Jitter::Equal,
    }
}

/// Start a limiter for one invocation.
///
/// Must be called inside a Tokio runtime.
pub fn rate_limiter(settings: &RateLimitSettings) -> CommonResult<RateLimiter> {
    RateLimiter::new(settings.requests_per_second)
}

impl BatchConfig {
    pub fn from_settings(batch: &BatchSettings, retry: &RetrySettings) -> CommonResult<Self> {
        let mut config = Self::new(batch.workers)?.with_retry(retry.to_retry_config()?);
        if let Some(secs) = batch.deadline_secs {
            if secs == 0 {
                return Err(CommonError::config_field("deadline_secs", "must be greater than 0"));
            }
            config = config.with_deadline(Duration::from_secs(secs));
        }
        Ok(config)
    }
}
