//! # Changecast Core
//!
//! Pipeline logic for Changecast - no infrastructure dependencies.
//!
//! This crate contains:
//! - Provider port interfaces (calendar, directory, contacts)
//! - The provider error taxonomy and rate-limited call helpers
//! - Bounded concurrent batch processing
//! - Idempotent calendar reconciliation
//! - Event-loop prevention and the execution summary
//!
//! ## Architecture Principles
//! - Only depends on `changecast-common` and `changecast-domain`
//! - No HTTP, storage SDK or platform code
//! - All external systems via traits
//! - Limiter and summary are created per invocation and passed in, never
//!   global

pub mod batch;
pub mod calendar_ports;
pub mod call;
pub mod contacts;
pub mod directory;
pub mod errors;
pub mod event_guard;
pub mod pipeline;
pub mod reconcile;
pub mod settings;
pub mod summary;

pub use batch::{BatchConfig, BatchReport, ConcurrentBatchProcessor};
pub use calendar_ports::{CalendarProvider, StaticTokenSupplier, TokenSupplier};
pub use call::{cancellable_call, limited_call, limited_call_with_cancel, CallError};
pub use contacts::{apply_contact_change, ContactStore, NoopContactStore};
pub use directory::{collect_directory, DirectoryError, DirectoryProvider};
pub use errors::ProviderError;
pub use event_guard::{DiscardReason, EventGuard, EventGuardConfig, EventOrigin};
pub use pipeline::dispatch_storage_events;
pub use reconcile::{IdempotencyReconciler, ReconcileError, ReconcileOutcome};
pub use settings::{rate_limiter, RetrySettingsExt};
pub use summary::{ExecutionSummary, SummarySnapshot, SUMMARY_TARGET};
