//! Reconciliation service

use std::sync::Arc;

use changecast_common::RateLimiter;
use changecast_domain::{DesiredMeeting, ExistingMeeting};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

use super::diff::diff_meeting;
use super::timezone::resolve_meeting;
use super::{ReconcileError, ReconcileOutcome};
use crate::calendar_ports::{CalendarProvider, TokenSupplier};

/// Create / update / skip decision for one desired meeting at a time
pub struct IdempotencyReconciler {
    calendar: Arc<dyn CalendarProvider>,
    tokens: Arc<dyn TokenSupplier>,
    default_tz: Tz,
    limiter: Option<Arc<RateLimiter>>,
}

impl IdempotencyReconciler {
    /// Build an unthrottled reconciler; see [`Self::with_rate_limiter`].
    pub fn new(
        calendar: Arc<dyn CalendarProvider>,
        tokens: Arc<dyn TokenSupplier>,
        default_tz: Tz,
    ) -> Self {
        Self { calendar, tokens, default_tz, limiter: None }
    }

    /// Take a permit from `limiter` before every provider call (token,
    /// query, create or update).
    ///
    /// Inside a batch, share the batch's limiter and build the batch with
    /// [`BatchConfig::self_limited`] so no extra permit is taken per attempt.
    ///
    /// [`BatchConfig::self_limited`]: crate::batch::BatchConfig::self_limited
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Zone used for meetings that name none.
    pub fn default_tz(&self) -> Tz {
        self.default_tz
    }

    /// Reconcile `desired` against the provider.
    ///
    /// With `force` an existing match is always rewritten. Errors are never
    /// retried here; callers wrap the whole call in a retry executor.
    #[instrument(skip(self, desired), fields(subject = %desired.subject, organizer = %desired.organizer))]
    pub async fn reconcile(
        &self,
        desired: &DesiredMeeting,
        force: bool,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let (resolved, window) = resolve_meeting(desired, self.default_tz)?;

        self.throttle().await?;
        let token = self.tokens.access_token().await?;

        self.throttle().await?;
        let candidates =
            self.calendar.query_events_by_window(&token, &resolved.organizer, window).await?;

        let Some(existing) = select_match(&resolved.subject, candidates) else {
            self.throttle().await?;
            let id = self.calendar.create_event(&token, &resolved).await?;
            info!(event_id = %id, "meeting created");
            return Ok(ReconcileOutcome::Created { id });
        };

        let diff = diff_meeting(&resolved, &existing);
        if !force && !diff.has_changes() {
            debug!(event_id = %existing.id, "meeting unchanged");
            return Ok(ReconcileOutcome::Unchanged { id: existing.id });
        }

        self.throttle().await?;
        self.calendar.update_event(&token, &existing.id, &resolved).await?;
        info!(event_id = %existing.id, changed = ?diff.changed_fields, force, "meeting updated");

        Ok(ReconcileOutcome::Updated { id: existing.id, changed: diff.changed_fields, forced: force })
    }

    async fn throttle(&self) -> Result<(), ReconcileError> {
        if let Some(limiter) = &self.limiter {
            limiter.wait().await?;
        }
        Ok(())
    }
}

/// Pick the earliest exact match; duplicates are reported, never deleted.
fn select_match(
    key: &changecast_domain::IdempotencyKey,
    candidates: Vec<ExistingMeeting>,
) -> Option<ExistingMeeting> {
    let mut matches: Vec<ExistingMeeting> =
        candidates.into_iter().filter(|m| key.matches(&m.subject)).collect();
    matches.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

    if matches.len() > 1 {
        warn!(
            duplicates = matches.len() - 1,
            kept = %matches[0].id,
            "multiple meetings share the idempotency key"
        );
    }
    matches.into_iter().next()
}
