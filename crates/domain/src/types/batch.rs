//! Work items and per-item outcomes of a batch run

use serde::{Deserialize, Serialize};

use crate::impl_domain_labels;

/// One unit of work handed to the batch processor
///
/// The payload is cloned for each attempt and never mutated once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem<P> {
    /// Caller-chosen identifier used in logs and error messages
    pub id: String,
    pub payload: P,
}

impl<P> WorkItem<P> {
    pub fn new(id: impl Into<String>, payload: P) -> Self {
        Self { id: id.into(), payload }
    }
}

/// Outcome of exactly one [`WorkItem`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult<T> {
    /// Position of the item in the submitted batch
    pub index: usize,
    pub item_id: String,
    pub outcome: ItemOutcome<T>,
}

impl<T> ItemResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Succeeded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Failed { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            ItemOutcome::Succeeded { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ItemOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome<T> {
    Succeeded {
        value: T,
        attempts: u32,
    },
    Failed {
        error: String,
        /// Classification of the final error
        retryable: bool,
        attempts: u32,
    },
    /// Never started because the batch deadline expired first
    NotAttempted,
}

/// Aggregate verdict of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every item succeeded (or the batch was empty)
    Succeeded,
    /// Some items failed or were skipped, at least one succeeded
    Degraded,
    /// Nothing succeeded in a non-empty batch
    Failed,
}

impl_domain_labels!(BatchStatus {
    Succeeded => "succeeded",
    Degraded => "degraded",
    Failed => "failed",
});
