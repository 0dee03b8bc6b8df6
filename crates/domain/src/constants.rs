//! Application constants
//!
//! Centralized location for domain-level defaults used by configuration and
//! the components built from it.

// Rate limiting
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

// Batch processing
pub const DEFAULT_BATCH_WORKERS: usize = 4;

// Retry
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 200;
pub const DEFAULT_RETRY_BACKOFF_BASE: f64 = 2.0;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;
pub const DEFAULT_RETRY_MAX_TOTAL_SECS: u64 = 120;

// Reconciliation
pub const DEFAULT_TIMEZONE: &str = "UTC";

// Event-loop guard: what the output step writes
pub const DEFAULT_OUTPUT_PREFIX: &str = "processed/";
pub const DEFAULT_MARKER_KEY: &str = "x-amz-meta-changecast-generated";
pub const DEFAULT_MARKER_VALUE: &str = "true";

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
