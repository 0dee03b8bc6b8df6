//! Field-level comparison of desired vs. existing meetings

use std::collections::BTreeSet;

use changecast_domain::{DiffResult, ExistingMeeting, MeetingField, ResolvedMeeting};
use chrono::{DateTime, DurationRound, Utc};

/// Compare the diffed fields; the body never counts as a change.
pub fn diff_meeting(desired: &ResolvedMeeting, existing: &ExistingMeeting) -> DiffResult {
    let mut changed_fields = Vec::new();

    if !desired.subject.matches(&existing.subject) {
        changed_fields.push(MeetingField::Subject);
    }
    if truncate_to_minute(desired.start) != truncate_to_minute(existing.start) {
        changed_fields.push(MeetingField::Start);
    }
    if truncate_to_minute(desired.end) != truncate_to_minute(existing.end) {
        changed_fields.push(MeetingField::End);
    }
    if normalize_location(desired.location.as_deref())
        != normalize_location(existing.location.as_deref())
    {
        changed_fields.push(MeetingField::Location);
    }
    if attendee_set(&desired.attendees) != attendee_set(&existing.attendees) {
        changed_fields.push(MeetingField::Attendees);
    }

    DiffResult { changed_fields }
}

fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.duration_trunc(chrono::Duration::minutes(1)).unwrap_or(instant)
}

fn normalize_location(location: Option<&str>) -> &str {
    location.map_or("", str::trim)
}

/// Order-independent set of normalized addresses
pub fn attendee_set<S: AsRef<str>>(attendees: &[S]) -> BTreeSet<String> {
    attendees
        .iter()
        .map(|a| normalize_address(a.as_ref()))
        .filter(|a| !a.is_empty())
        .collect()
}

/// `"Jane <MAILTO:Jane@Example.com>"` → `"jane@example.com"`
pub fn normalize_address(raw: &str) -> String {
    let mut address = raw.trim();
    if let (Some(open), Some(close)) = (address.find('<'), address.rfind('>')) {
        if open < close {
            address = address[open + 1..close].trim();
        }
    }
    if address.get(..7).is_some_and(|scheme| scheme.eq_ignore_ascii_case("mailto:")) {
        address = address[7..].trim();
    }
    address.to_lowercase()
}
