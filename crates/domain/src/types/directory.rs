//! Directory provider records

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub department: Option<String>,
}

/// One page of a paginated user listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryPage {
    pub users: Vec<DirectoryUser>,
    /// Token for the next page; `None` on the last page
    pub next_page_token: Option<String>,
}
