//! Event-loop prevention for storage-triggered pipelines
//!
//! The pipeline writes its own output back to the bucket that triggers it.
//! [`EventGuard::classify`] recognises those writes by key prefix or by the
//! marker metadata the output step attaches, so they can be dropped before
//! any work is scheduled. Anything that does not clearly match is processed;
//! the marker check needs both a key and a value.

use changecast_domain::{EventGuardSettings, StorageEvent};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::summary::ExecutionSummary;

/// Patterns describing what the pipeline itself writes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventGuardConfig {
    /// Key prefixes the pipeline writes under; blank entries are ignored
    pub output_prefixes: Vec<String>,
    /// Metadata key attached to pipeline output, matched case-insensitively
    pub marker_key: String,
    /// Value `marker_key` must carry
    pub marker_value: String,
}

impl From<&EventGuardSettings> for EventGuardConfig {
    fn from(settings: &EventGuardSettings) -> Self {
        Self {
            output_prefixes: settings.output_prefixes.clone(),
            marker_key: settings.marker_key.clone(),
            marker_value: settings.marker_value.clone(),
        }
    }
}

/// Which pattern marked an event as self-generated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DiscardReason {
    OutputPrefix { prefix: String },
    MarkerMetadata { key: String },
}

/// Classification of one storage event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum EventOrigin {
    External,
    SelfGenerated { reason: DiscardReason },
}

impl EventOrigin {
    /// Whether the event should be discarded
    pub fn is_self_generated(&self) -> bool {
        matches!(self, Self::SelfGenerated { .. })
    }
}

/// Screens storage events before they reach the batch layer
#[derive(Debug, Clone)]
pub struct EventGuard {
    config: EventGuardConfig,
}

impl EventGuard {
    /// Build a guard from its patterns.
    pub fn new(config: EventGuardConfig) -> Self {
        Self { config }
    }

    /// Patterns in use.
    pub fn config(&self) -> &EventGuardConfig {
        &self.config
    }

    /// Decide whether `event` was written by the pipeline itself.
    pub fn classify(&self, event: &StorageEvent) -> EventOrigin {
        if event.key.is_empty() {
            return EventOrigin::External;
        }

        if let Some(prefix) = self
            .config
            .output_prefixes
            .iter()
            .find(|prefix| !prefix.is_empty() && event.key.starts_with(prefix.as_str()))
        {
            return EventOrigin::SelfGenerated {
                reason: DiscardReason::OutputPrefix { prefix: prefix.clone() },
            };
        }

        let marker_key = self.config.marker_key.trim();
        let marker_value = self.config.marker_value.trim();
        if !marker_key.is_empty() && !marker_value.is_empty() {
            let marked = event.metadata.iter().any(|(key, value)| {
                key.trim().eq_ignore_ascii_case(marker_key) && value.trim() == marker_value
            });
            if marked {
                return EventOrigin::SelfGenerated {
                    reason: DiscardReason::MarkerMetadata { key: marker_key.to_string() },
                };
            }
        }

        EventOrigin::External
    }

    /// Drop self-generated events, counting each one in `summary`.
    pub fn admit(&self, events: Vec<StorageEvent>, summary: &ExecutionSummary) -> Vec<StorageEvent> {
        events
            .into_iter()
            .filter(|event| match self.classify(event) {
                EventOrigin::External => true,
                EventOrigin::SelfGenerated { reason } => {
                    debug!(key = %event.key, ?reason, "discarding self-generated event");
                    summary.record_event_discarded();
                    false
                }
            })
            .collect()
    }
}
