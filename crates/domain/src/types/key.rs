//! Natural keys for idempotent external resources

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ChangecastError, Result};

/// Stable identity of a desired calendar resource
///
/// The key is the exact meeting subject. Correlation identifiers (change
/// numbers, ticket ids) are embedded in square brackets so that a subject is
/// unique per logical request, e.g. `"Network maintenance [CHG0012345]"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Wrap an existing subject
    ///
    /// # Errors
    /// Returns `ChangecastError::InvalidInput` for a blank subject.
    pub fn new(subject: impl Into<String>) -> Result<Self> {
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(ChangecastError::InvalidInput("idempotency key must not be empty".into()));
        }
        Ok(Self(subject))
    }

    /// Build `"title [ID1] [ID2]"`, skipping blank ids
    ///
    /// # Errors
    /// Returns `ChangecastError::InvalidInput` when neither a title nor any
    /// id is present.
    pub fn compose<I, S>(title: &str, correlation_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut subject = title.trim().to_string();
        for id in correlation_ids {
            let id = id.as_ref().trim();
            if id.is_empty() {
                continue;
            }
            if !subject.is_empty() {
                subject.push(' ');
            }
            subject.push('[');
            subject.push_str(id);
            subject.push(']');
        }
        Self::new(subject)
    }

    /// Bracketed tokens in order of appearance
    pub fn correlation_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        let mut rest = self.0.as_str();
        while let Some(open) = rest.find('[') {
            let after = &rest[open + 1..];
            let Some(close) = after.find(']') else { break };
            let id = after[..close].trim();
            if !id.is_empty() {
                ids.push(id);
            }
            rest = &after[close + 1..];
        }
        ids
    }

    /// Exact, case-sensitive comparison against a provider-side subject
    pub fn matches(&self, subject: &str) -> bool {
        self.0 == subject
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
