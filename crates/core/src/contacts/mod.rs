//! Idempotent contact-list changes

pub mod ports;

use changecast_domain::{ContactChange, ContactOutcome};
use tracing::debug;

pub use ports::{ContactStore, NoopContactStore};

use crate::errors::ProviderError;

/// Apply `change`, treating "already there" and "already gone" as success.
pub async fn apply_contact_change(
    store: &dyn ContactStore,
    change: &ContactChange,
) -> Result<ContactOutcome, ProviderError> {
    let result = match change {
        ContactChange::Subscribe { list, contact } => {
            store.create_contact(list, contact).await.map(|()| ContactOutcome::Created)
        }
        ContactChange::Unsubscribe { list, email } => {
            store.delete_contact(list, email).await.map(|()| ContactOutcome::Deleted)
        }
    };

    match (change, result) {
        (ContactChange::Subscribe { .. }, Err(ProviderError::Conflict(_)))
        | (ContactChange::Unsubscribe { .. }, Err(ProviderError::NotFound(_))) => {
            debug!(list = change.list(), email = change.email(), "contact already in requested state");
            Ok(ContactOutcome::Unchanged)
        }
        (_, result) => result,
    }
}
