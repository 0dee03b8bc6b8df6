//! Port interfaces for the user directory

use async_trait::async_trait;
use changecast_domain::{DirectoryPage, DirectoryUser};

use crate::errors::ProviderError;

/// Paginated, read-only user directory
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// List one page of users; `None` requests the first page
    async fn list_users(&self, page_token: Option<&str>) -> Result<DirectoryPage, ProviderError>;

    /// Look up a single user by id
    async fn get_user(&self, id: &str) -> Result<DirectoryUser, ProviderError>;
}
