//! Inbound storage notifications

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One storage-notification event: an object key plus what happened to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    /// Decoded object key
    pub key: String,
    /// Provider event name, e.g. `ObjectCreated:Put`
    pub event_type: String,
    /// User metadata attached to the object, if the notification carries it
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl StorageEvent {
    pub fn new(key: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self { key: key.into(), event_type: event_type.into(), metadata: BTreeMap::new() }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
