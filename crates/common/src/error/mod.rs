//! Common error types and classification utilities
//!
//! This module provides the error-handling vocabulary shared by every
//! Changecast crate:
//!
//! 1. **`ErrorClassification` trait**: the single interface the retry machinery
//!    consults to decide whether a failure is transient (retry) or permanent
//!    (surface immediately).
//!
//! 2. **`ErrorSeverity` enum**: a unified severity scale used when failures are
//!    logged or folded into the execution summary.
//!
//! 3. **`CommonError`**: failures raised by the generic building blocks
//!    themselves (invalid limiter configuration, a stopped rate limiter, …).
//!
//! ## Composing module errors
//!
//! Module-specific errors keep their own variants and implement
//! `ErrorClassification` so they can flow through `RetryExecutor` with the
//! `ClassifiedRetry` policy:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum LookupError {
//!     #[error("provider throttled the request")]
//!     Throttled { retry_after: Option<Duration> },
//!
//!     #[error("record rejected: {0}")]
//!     Rejected(String),
//! }
//!
//! impl ErrorClassification for LookupError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, Self::Throttled { .. })
//!     }
//!     // ... severity, is_critical, retry_after
//! }
//! ```
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Resource already absent, cancelled task |
//! | **Warning** | Degraded but operational | Throttling, transient provider failures |
//! | **Error** | Failure requiring attention | Validation rejects, bad configuration |
//! | **Critical** | Integrity at risk | Invariant violations, worker panics |

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised by the generic building blocks in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommonError {
    /// Invalid configuration supplied to a component
    #[error("Configuration error{}: {message}", .field.as_ref().map(|f| format!(" in field '{f}'")).unwrap_or_default())]
    Config { message: String, field: Option<String> },

    /// A background task or the resource it guards has been shut down
    #[error("Task '{task}' cancelled{}", .reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    TaskCancelled { task: String, reason: Option<String> },

    /// An operation did not complete within its allotted time
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },

    /// Internal errors that shouldn't normally occur
    #[error("Internal error{}: {message}", .context.as_ref().map(|c| format!(" in '{c}'")).unwrap_or_default())]
    Internal { message: String, context: Option<String> },
}

impl CommonError {
    /// Create a simple configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Create a configuration error tied to a specific field
    pub fn config_field<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    /// Create a cancellation error for a named task
    pub fn task_cancelled<S: Into<String>>(task: S) -> Self {
        Self::TaskCancelled { task: task.into(), reason: None }
    }

    /// Create a cancellation error with an explanation
    pub fn task_cancelled_with_reason<S: Into<String>, R: Into<String>>(task: S, reason: R) -> Self {
        Self::TaskCancelled { task: task.into(), reason: Some(reason.into()) }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration }
    }

    /// Create an internal error with context
    pub fn internal_with_context<S: Into<String>, C: Into<String>>(message: S, context: C) -> Self {
        Self::Internal { message: message.into(), context: Some(context.into()) }
    }
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. } => ErrorSeverity::Error,
            Self::TaskCancelled { .. } => ErrorSeverity::Info,
            Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Error classification trait for consistent retry and reporting decisions
///
/// The retry executor never inspects error messages; it asks the error
/// itself. Classification must be decided when the error value is created and
/// must not change afterwards.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient: throttling, provider 5xx responses,
    /// network timeouts. Everything else is permanent.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when the failure carried an explicit hint
    /// (e.g. a `Retry-After` header).
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for logging and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
