//! Domain types and models
//!
//! Plain data shared by the core pipeline and its adapters. Nothing here does
//! I/O or holds locks.

pub mod batch;
pub mod contact;
pub mod directory;
pub mod key;
pub mod meeting;
pub mod storage;

pub use batch::{BatchStatus, ItemOutcome, ItemResult, WorkItem};
pub use contact::{Contact, ContactChange, ContactOutcome};
pub use directory::{DirectoryPage, DirectoryUser};
pub use key::IdempotencyKey;
pub use meeting::{DesiredMeeting, DiffResult, ExistingMeeting, MeetingField, MeetingWindow, ResolvedMeeting};
pub use storage::StorageEvent;
