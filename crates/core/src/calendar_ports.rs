//! Calendar provider port interfaces

use async_trait::async_trait;
use changecast_domain::{ExistingMeeting, MeetingWindow, ResolvedMeeting};

use crate::errors::ProviderError;

/// Calendar operations the reconciler needs
///
/// Implementations must not retry internally; retries belong to the caller
/// so that a retry always repeats the full lookup-then-write sequence.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Create an event and return the provider-assigned id
    async fn create_event(&self, token: &str, meeting: &ResolvedMeeting) -> Result<String, ProviderError>;

    /// Overwrite the event `event_id` with `meeting`
    async fn update_event(
        &self,
        token: &str,
        event_id: &str,
        meeting: &ResolvedMeeting,
    ) -> Result<(), ProviderError>;

    /// Events on `organizer`'s calendar overlapping `window`
    async fn query_events_by_window(
        &self,
        token: &str,
        organizer: &str,
        window: MeetingWindow,
    ) -> Result<Vec<ExistingMeeting>, ProviderError>;
}

/// Supplies a bearer token for calendar calls
#[async_trait]
pub trait TokenSupplier: Send + Sync {
    async fn access_token(&self) -> Result<String, ProviderError>;
}

/// Token supplier returning a fixed value
#[derive(Debug, Clone)]
pub struct StaticTokenSupplier {
    token: String,
}

impl StaticTokenSupplier {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenSupplier for StaticTokenSupplier {
    async fn access_token(&self) -> Result<String, ProviderError> {
        Ok(self.token.clone())
    }
}
