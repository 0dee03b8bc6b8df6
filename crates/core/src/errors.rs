//! Provider error taxonomy
//!
//! Every downstream provider adapter reports failures as [`ProviderError`].
//! The variant *is* the classification: it is decided once, where the
//! response is interpreted, and never re-derived from message text.

use std::time::Duration;

use changecast_common::{ErrorClassification, ErrorSeverity};
use thiserror::Error;

/// Failure reported by a directory, contact or calendar provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    // Transient
    #[error("Provider throttled the request{}", .retry_after.map(|d| format!(" (retry after {d:?})")).unwrap_or_default())]
    Throttled { retry_after: Option<Duration> },

    #[error("Provider unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    // Permanent
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl ProviderError {
    /// Map a non-success HTTP status to its classified error
    ///
    /// 429 → `Throttled`, 5xx → `Unavailable`, 404 → `NotFound`,
    /// 409 → `Conflict`, 401/403 → `Unauthorized`, other 4xx → `Validation`.
    /// Anything else is an unexpected response and maps to `Malformed`.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => Self::Throttled { retry_after: None },
            500..=599 => Self::Unavailable { status, message },
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            401 | 403 => Self::Unauthorized(message),
            400..=499 => Self::Validation(message),
            _ => Self::Malformed(format!("unexpected status {status}: {message}")),
        }
    }

    /// Throttling with an explicit `Retry-After` hint
    pub fn throttled(retry_after: Option<Duration>) -> Self {
        Self::Throttled { retry_after }
    }
}

impl ErrorClassification for ProviderError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Throttled { .. } | Self::Unavailable { .. } | Self::Network(_) | Self::Timeout(_)
        )
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Throttled { .. } | Self::Unavailable { .. } | Self::Network(_) | Self::Timeout(_) => {
                ErrorSeverity::Warning
            }
            Self::NotFound(_) | Self::Conflict(_) => ErrorSeverity::Info,
            Self::Validation(_) | Self::Malformed(_) => ErrorSeverity::Error,
            Self::Unauthorized(_) => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled { retry_after } => *retry_after,
            _ => None,
        }
    }
}
