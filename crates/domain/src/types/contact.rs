//! Contact-list membership changes

use serde::{Deserialize, Serialize};

use crate::impl_domain_labels;

/// A subscriber on a provider-side contact list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Topic the contact subscribes to
    pub topic: Option<String>,
}

impl Contact {
    pub fn new(email: impl Into<String>) -> Self {
        Self { email: email.into(), first_name: None, last_name: None, topic: None }
    }
}

/// A requested membership change on one contact list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ContactChange {
    Subscribe { list: String, contact: Contact },
    Unsubscribe { list: String, email: String },
}

impl ContactChange {
    pub fn list(&self) -> &str {
        match self {
            Self::Subscribe { list, .. } | Self::Unsubscribe { list, .. } => list,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Self::Subscribe { contact, .. } => &contact.email,
            Self::Unsubscribe { email, .. } => email,
        }
    }
}

/// Idempotent result of applying a [`ContactChange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactOutcome {
    Created,
    Deleted,
    /// Already in the requested state
    Unchanged,
}

impl_domain_labels!(ContactOutcome {
    Created => "created",
    Deleted => "deleted",
    Unchanged => "unchanged",
});
