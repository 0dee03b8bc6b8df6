//! Directory walking through the shared rate limiter

pub mod ports;

use std::collections::HashSet;

use changecast_common::{CommonError, RateLimiter, RetryExecutor, RetryPolicy};
use changecast_domain::DirectoryUser;
use thiserror::Error;
use tracing::{debug, instrument};

pub use ports::DirectoryProvider;

use crate::call::{limited_call, CallError};
use crate::errors::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The provider handed back a page token it already returned
    #[error("Directory returned page token '{token}' twice")]
    RepeatedPageToken { token: String },

    #[error(transparent)]
    Limiter(#[from] CommonError),
}

impl From<CallError<ProviderError>> for DirectoryError {
    fn from(err: CallError<ProviderError>) -> Self {
        match err {
            CallError::Provider(e) => Self::Provider(e),
            CallError::Limiter(e) => Self::Limiter(e),
            CallError::Interrupted => Self::Limiter(CommonError::task_cancelled("directory_walk")),
        }
    }
}

/// Fetch every page of the directory.
///
/// Each page request waits for its own permit and is retried per
/// `executor`. The first page error that survives retries aborts the walk.
#[instrument(skip_all)]
pub async fn collect_directory<P>(
    provider: &dyn DirectoryProvider,
    limiter: &RateLimiter,
    executor: &RetryExecutor<P>,
) -> Result<Vec<DirectoryUser>, DirectoryError>
where
    P: RetryPolicy<CallError<ProviderError>>,
{
    let mut users = Vec::new();
    let mut seen_tokens = HashSet::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0_u32;

    loop {
        let token = page_token.as_deref();
        let page = limited_call(limiter, executor, || provider.list_users(token))
            .await
            .into_result()
            .map_err(|e| DirectoryError::from(e.into_last_error()))?;

        pages += 1;
        debug!(page = pages, users = page.users.len(), "directory page fetched");
        users.extend(page.users);

        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(next) => {
                if !seen_tokens.insert(next.clone()) {
                    return Err(DirectoryError::RepeatedPageToken { token: next });
                }
                page_token = Some(next);
            }
            None => break,
        }
    }

    debug!(pages, users = users.len(), "directory walk complete");
    Ok(users)
}
