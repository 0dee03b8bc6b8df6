//! Configuration structures
//!
//! Every section deserializes with defaults, so a file only needs the values
//! it overrides. Loading lives in `changecast-infra`; conversion into
//! component configs lives next to each component in `changecast-core`.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BATCH_WORKERS, DEFAULT_LOG_LEVEL, DEFAULT_MARKER_KEY, DEFAULT_MARKER_VALUE,
    DEFAULT_OUTPUT_PREFIX, DEFAULT_REQUESTS_PER_SECOND, DEFAULT_RETRY_BACKOFF_BASE,
    DEFAULT_RETRY_INITIAL_DELAY_MS, DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_RETRY_MAX_DELAY_MS,
    DEFAULT_RETRY_MAX_TOTAL_SECS, DEFAULT_TIMEZONE,
};
use crate::errors::{ChangecastError, Result};
use crate::impl_domain_labels;

/// Top-level configuration for one Changecast deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rate_limit: RateLimitSettings,
    pub batch: BatchSettings,
    pub retry: RetrySettings,
    pub reconciler: ReconcilerSettings,
    pub event_guard: EventGuardSettings,
    pub logging: LoggingSettings,
}

impl Config {
    /// Validate every section
    ///
    /// # Errors
    /// Returns `ChangecastError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.rate_limit.validate()?;
        self.batch.validate()?;
        self.retry.validate()?;
        self.reconciler.validate()?;
        self.event_guard.validate()?;
        Ok(())
    }
}

/// Outbound call budget shared by every worker of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub requests_per_second: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self { requests_per_second: DEFAULT_REQUESTS_PER_SECOND }
    }
}

impl RateLimitSettings {
    fn validate(&self) -> Result<()> {
        if self.requests_per_second == 0 {
            return Err(config_error("rate_limit.requests_per_second", "must be greater than 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Upper bound on concurrently running workers
    pub workers: usize,
    /// Deadline for a whole batch; `None` means unbounded
    pub deadline_secs: Option<u64>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self { workers: DEFAULT_BATCH_WORKERS, deadline_secs: None }
    }
}

impl BatchSettings {
    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(config_error("batch.workers", "must be greater than 0"));
        }
        if self.deadline_secs == Some(0) {
            return Err(config_error("batch.deadline_secs", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Jitter mode as written in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JitterMode {
    None,
    Full,
    #[default]
    Equal,
}

impl_domain_labels!(JitterMode {
    None => "none",
    Full => "full",
    Equal => "equal",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_base: f64,
    pub max_delay_ms: u64,
    pub jitter: JitterMode,
    /// Total time budget across attempts; `None` disables the budget
    pub max_total_secs: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_RETRY_INITIAL_DELAY_MS,
            backoff_base: DEFAULT_RETRY_BACKOFF_BASE,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            jitter: JitterMode::default(),
            max_total_secs: Some(DEFAULT_RETRY_MAX_TOTAL_SECS),
        }
    }
}

impl RetrySettings {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(config_error("retry.max_attempts", "must be greater than 0"));
        }
        if !self.backoff_base.is_finite() || self.backoff_base < 1.0 {
            return Err(config_error("retry.backoff_base", "must be at least 1.0"));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(config_error("retry.initial_delay_ms", "must not exceed max_delay_ms"));
        }
        if self.max_total_secs == Some(0) {
            return Err(config_error("retry.max_total_secs", "must be greater than 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerSettings {
    /// IANA zone applied to meetings that carry no timezone
    pub default_timezone: String,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self { default_timezone: DEFAULT_TIMEZONE.to_string() }
    }
}

impl ReconcilerSettings {
    /// Resolve the configured default timezone
    ///
    /// # Errors
    /// Returns `ChangecastError::Config` for names outside the IANA database.
    pub fn default_tz(&self) -> Result<Tz> {
        self.default_timezone.parse::<Tz>().map_err(|_| {
            config_error(
                "reconciler.default_timezone",
                &format!("unknown timezone '{}'", self.default_timezone),
            )
        })
    }

    fn validate(&self) -> Result<()> {
        self.default_tz().map(|_| ())
    }
}

/// Describes what the pipeline's own output step writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventGuardSettings {
    pub output_prefixes: Vec<String>,
    pub marker_key: String,
    pub marker_value: String,
}

impl Default for EventGuardSettings {
    fn default() -> Self {
        Self {
            output_prefixes: vec![DEFAULT_OUTPUT_PREFIX.to_string()],
            marker_key: DEFAULT_MARKER_KEY.to_string(),
            marker_value: DEFAULT_MARKER_VALUE.to_string(),
        }
    }
}

impl EventGuardSettings {
    fn validate(&self) -> Result<()> {
        let has_key = !self.marker_key.trim().is_empty();
        if has_key && self.marker_value.trim().is_empty() {
            return Err(config_error(
                "event_guard.marker_value",
                "required when marker_key is set",
            ));
        }
        if self.output_prefixes.iter().all(|p| p.trim().is_empty()) && !has_key {
            return Err(config_error(
                "event_guard",
                "at least one output prefix or a marker key is required",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), json: false }
    }
}

fn config_error(field: &str, message: &str) -> ChangecastError {
    ChangecastError::Config(format!("{field}: {message}"))
}
