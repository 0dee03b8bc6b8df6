//! Calendar meeting shapes used by the idempotency reconciler

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_labels;
use crate::types::key::IdempotencyKey;

/// Meeting as requested by the caller, in the meeting's local wall-clock time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredMeeting {
    pub subject: IdempotencyKey,
    /// Mailbox whose calendar owns the meeting
    pub organizer: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// IANA zone name; `None` falls back to the configured default
    pub timezone: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    /// Not compared when diffing
    pub body: String,
}

/// Desired meeting with its timezone resolved to absolute instants
///
/// This is what gets written to the provider on create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMeeting {
    pub subject: IdempotencyKey,
    pub organizer: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub body: String,
}

/// Provider-side meeting, captured fresh for each reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingMeeting {
    pub id: String,
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub body: String,
}

/// Half-open UTC interval `[start, end)` used for provider lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MeetingWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Fields that take part in diffing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingField {
    Subject,
    Start,
    End,
    Location,
    Attendees,
}

impl_domain_labels!(MeetingField {
    Subject => "subject",
    Start => "start",
    End => "end",
    Location => "location",
    Attendees => "attendees",
});

/// Result of comparing a desired meeting against an existing one
///
/// Derived per reconciliation and never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub changed_fields: Vec<MeetingField>,
}

impl DiffResult {
    pub fn has_changes(&self) -> bool {
        !self.changed_fields.is_empty()
    }

    pub fn contains(&self, field: MeetingField) -> bool {
        self.changed_fields.contains(&field)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_window_is_half_open() {
        let window = MeetingWindow {
            start: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
        };
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_diff_result() {
        let diff = DiffResult { changed_fields: vec![MeetingField::Attendees] };
        assert!(diff.has_changes());
        assert!(diff.contains(MeetingField::Attendees));
        assert!(!DiffResult::default().has_changes());
        assert_eq!(MeetingField::Start.to_string(), "start");
    }
}
