//! Port interfaces for contact-list providers

use async_trait::async_trait;
use changecast_domain::Contact;

use crate::errors::ProviderError;

/// Contact lists on an email provider
///
/// `create_contact` reports an existing contact as `ProviderError::Conflict`
/// and `delete_contact` reports a missing one as `ProviderError::NotFound`.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn create_contact(&self, list: &str, contact: &Contact) -> Result<(), ProviderError>;

    async fn delete_contact(&self, list: &str, email: &str) -> Result<(), ProviderError>;

    async fn list_contacts(&self, list: &str) -> Result<Vec<Contact>, ProviderError>;
}

/// Contact store that accepts everything and stores nothing
///
/// Used for dry runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopContactStore;

#[async_trait]
impl ContactStore for NoopContactStore {
    async fn create_contact(&self, _list: &str, _contact: &Contact) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn delete_contact(&self, _list: &str, _email: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn list_contacts(&self, _list: &str) -> Result<Vec<Contact>, ProviderError> {
        Ok(Vec::new())
    }
}
