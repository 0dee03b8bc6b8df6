//! Idempotent calendar reconciliation
//!
//! Decides create / update / skip for one desired meeting from the
//! provider's current state so that at-least-once redelivery never produces
//! a duplicate event.
//!
//! ```text
//! NotFound          -> Create
//! Found & no diff   -> Skip
//! Found & diff      -> Update
//! Found & force     -> Update
//! ```
//!
//! The lookup-then-write sequence is not transactional. Two invocations
//! reconciling the same meeting at the same moment can both observe
//! "not found" and both create; that race is accepted.

pub mod diff;
pub mod reconciler;
pub mod timezone;

use std::time::Duration;

use changecast_common::{CommonError, ErrorClassification, ErrorSeverity};
use changecast_domain::MeetingField;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::ProviderError;

pub use diff::diff_meeting;
pub use reconciler::IdempotencyReconciler;

/// What reconciliation did to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Created { id: String },
    Updated { id: String, changed: Vec<MeetingField>, forced: bool },
    Unchanged { id: String },
}

impl ReconcileOutcome {
    /// Short label for logs
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Unchanged { .. } => "unchanged",
        }
    }

    /// Provider id of the reconciled event
    pub fn id(&self) -> &str {
        match self {
            Self::Created { id } | Self::Updated { id, .. } | Self::Unchanged { id } => id,
        }
    }

    /// Whether a write was issued
    pub fn wrote(&self) -> bool {
        !matches!(self, Self::Unchanged { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("Unknown timezone '{0}'")]
    InvalidTimezone(String),

    #[error("Local time {local} does not exist in {zone}")]
    NonexistentLocalTime { local: NaiveDateTime, zone: String },

    #[error("Local time {local} is ambiguous in {zone}")]
    AmbiguousLocalTime { local: NaiveDateTime, zone: String },

    #[error("Invalid meeting: {0}")]
    InvalidMeeting(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Limiter(#[from] CommonError),
}

impl ErrorClassification for ReconcileError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Provider(e) => e.severity(),
            Self::Limiter(e) => e.severity(),
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_critical(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Provider(e) => e.retry_after(),
            _ => None,
        }
    }
}
