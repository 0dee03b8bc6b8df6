//! Execution summary aggregated across concurrent workers
//!
//! One [`ExecutionSummary`] is created per top-level invocation and shared by
//! `Arc` with every producer. Each `record_*` call moves exactly one field
//! under a short lock; nothing else blocks. At teardown the owner calls
//! [`ExecutionSummary::finish`], which only succeeds once every producer has
//! dropped its handle, and emits the whole run as a single structured event.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use changecast_domain::ContactOutcome;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::reconcile::ReconcileOutcome;

/// `tracing` target of the end-of-run summary event
pub const SUMMARY_TARGET: &str = "changecast::summary";

#[derive(Debug, Default)]
struct SummaryState {
    items_succeeded: u64,
    retryable_failures: u64,
    permanent_failures: u64,
    not_attempted: u64,
    retries: u64,
    contacts_created: u64,
    contacts_deleted: u64,
    contacts_unchanged: u64,
    meetings_created: u64,
    meetings_updated: u64,
    meetings_unchanged: u64,
    events_discarded: u64,
    emails_sent: u64,
    processed_customers: BTreeSet<String>,
    errors: Vec<String>,
}

/// Thread-safe run-wide counters
#[derive(Debug)]
pub struct ExecutionSummary {
    started_at: DateTime<Utc>,
    state: Mutex<SummaryState>,
}

impl Default for ExecutionSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionSummary {
    /// Start an empty summary stamped with the current time.
    pub fn new() -> Self {
        Self { started_at: Utc::now(), state: Mutex::new(SummaryState::default()) }
    }

    /// Convenience for the usual shared construction
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// When the run started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Count one successful batch item.
    pub fn record_item_succeeded(&self) {
        self.state.lock().items_succeeded += 1;
    }

    /// Record an item whose final error was transient, keeping its message
    pub fn record_retryable_failure(&self, item_id: &str, error: &str) {
        let mut state = self.state.lock();
        state.retryable_failures += 1;
        state.errors.push(format!("{item_id}: {error}"));
    }

    /// Record an item whose final error was permanent, keeping its message
    pub fn record_permanent_failure(&self, item_id: &str, error: &str) {
        let mut state = self.state.lock();
        state.permanent_failures += 1;
        state.errors.push(format!("{item_id}: {error}"));
    }

    /// Count one item that never made a call.
    pub fn record_not_attempted(&self) {
        self.state.lock().not_attempted += 1;
    }

    /// Add retry attempts beyond the first call of an item
    pub fn record_retries(&self, retries: u32) {
        if retries > 0 {
            self.state.lock().retries += u64::from(retries);
        }
    }

    /// Count a contact change by outcome.
    pub fn record_contact(&self, outcome: ContactOutcome) {
        let mut state = self.state.lock();
        match outcome {
            ContactOutcome::Created => state.contacts_created += 1,
            ContactOutcome::Deleted => state.contacts_deleted += 1,
            ContactOutcome::Unchanged => state.contacts_unchanged += 1,
        }
    }

    /// Count a reconciled meeting by outcome.
    pub fn record_meeting(&self, outcome: &ReconcileOutcome) {
        let mut state = self.state.lock();
        match outcome {
            ReconcileOutcome::Created { .. } => state.meetings_created += 1,
            ReconcileOutcome::Updated { .. } => state.meetings_updated += 1,
            ReconcileOutcome::Unchanged { .. } => state.meetings_unchanged += 1,
        }
    }

    /// Count one self-generated storage event dropped by the guard.
    pub fn record_event_discarded(&self) {
        self.state.lock().events_discarded += 1;
    }

    /// Count one outbound notification email.
    pub fn record_email_sent(&self) {
        self.state.lock().emails_sent += 1;
    }

    /// Add a customer to the de-duplicated processed set
    pub fn record_customer_processed(&self, customer_id: &str) {
        let mut state = self.state.lock();
        if !state.processed_customers.contains(customer_id) {
            state.processed_customers.insert(customer_id.to_string());
        }
    }

    /// Append a free-form error not tied to a batch item
    pub fn record_error(&self, message: impl Into<String>) {
        self.state.lock().errors.push(message.into());
    }

    /// Consume the summary and emit it as one structured event.
    ///
    /// Returns the summary back if other handles are still alive, i.e. some
    /// producer has not been joined yet.
    pub fn finish(self: Arc<Self>) -> Result<SummarySnapshot, Arc<Self>> {
        let summary = Arc::try_unwrap(self)?;
        let snapshot = summary.into_snapshot();
        snapshot.emit();
        Ok(snapshot)
    }

    fn into_snapshot(self) -> SummarySnapshot {
        let state = self.state.into_inner();
        let finished_at = Utc::now();
        let duration_ms =
            u64::try_from((finished_at - self.started_at).num_milliseconds()).unwrap_or(0);

        SummarySnapshot {
            started_at: self.started_at,
            finished_at,
            duration_ms,
            items_succeeded: state.items_succeeded,
            retryable_failures: state.retryable_failures,
            permanent_failures: state.permanent_failures,
            not_attempted: state.not_attempted,
            retries: state.retries,
            contacts_created: state.contacts_created,
            contacts_deleted: state.contacts_deleted,
            contacts_unchanged: state.contacts_unchanged,
            meetings_created: state.meetings_created,
            meetings_updated: state.meetings_updated,
            meetings_unchanged: state.meetings_unchanged,
            events_discarded: state.events_discarded,
            emails_sent: state.emails_sent,
            processed_customers: state.processed_customers.into_iter().collect(),
            errors: state.errors,
        }
    }
}

/// Read-only view of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySnapshot {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub items_succeeded: u64,
    pub retryable_failures: u64,
    pub permanent_failures: u64,
    pub not_attempted: u64,
    pub retries: u64,
    pub contacts_created: u64,
    pub contacts_deleted: u64,
    pub contacts_unchanged: u64,
    pub meetings_created: u64,
    pub meetings_updated: u64,
    pub meetings_unchanged: u64,
    pub events_discarded: u64,
    pub emails_sent: u64,
    /// Sorted, de-duplicated
    pub processed_customers: Vec<String>,
    pub errors: Vec<String>,
}

impl SummarySnapshot {
    /// Every counter by name
    pub fn counters(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            ("items_succeeded", self.items_succeeded),
            ("retryable_failures", self.retryable_failures),
            ("permanent_failures", self.permanent_failures),
            ("not_attempted", self.not_attempted),
            ("retries", self.retries),
            ("contacts_created", self.contacts_created),
            ("contacts_deleted", self.contacts_deleted),
            ("contacts_unchanged", self.contacts_unchanged),
            ("meetings_created", self.meetings_created),
            ("meetings_updated", self.meetings_updated),
            ("meetings_unchanged", self.meetings_unchanged),
            ("events_discarded", self.events_discarded),
            ("emails_sent", self.emails_sent),
            ("processed_customers", self.processed_customers.len() as u64),
            ("errors", self.errors.len() as u64),
        ])
    }

    /// Retryable plus permanent failures.
    pub fn failures(&self) -> u64 {
        self.retryable_failures + self.permanent_failures
    }

    /// Whether any item failed.
    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }

    fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => info!(
                target: SUMMARY_TARGET,
                items_succeeded = self.items_succeeded,
                failures = self.failures(),
                not_attempted = self.not_attempted,
                duration_ms = self.duration_ms,
                summary = %json,
                "execution summary"
            ),
            Err(e) => warn!(target: SUMMARY_TARGET, error = %e, "execution summary not serializable"),
        }
    }
}
