//! Wall-clock to UTC resolution
//!
//! Unknown zones and DST-affected local times fail closed; only a missing
//! zone falls back to the configured default.

use changecast_domain::{DesiredMeeting, MeetingWindow, ResolvedMeeting};
use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use super::ReconcileError;

/// Resolve an optional IANA name, falling back to `default` when absent.
pub fn resolve_zone(name: Option<&str>, default: Tz) -> Result<Tz, ReconcileError> {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => {
            name.parse::<Tz>().map_err(|_| ReconcileError::InvalidTimezone(name.to_string()))
        }
        _ => {
            warn!(default = %default, "meeting has no timezone, using default");
            Ok(default)
        }
    }
}

/// Convert a local wall-clock time in `zone` to UTC.
pub fn to_utc(local: NaiveDateTime, zone: Tz) -> Result<DateTime<Utc>, ReconcileError> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(instant) => Ok(instant.with_timezone(&Utc)),
        LocalResult::None => {
            Err(ReconcileError::NonexistentLocalTime { local, zone: zone.name().to_string() })
        }
        LocalResult::Ambiguous(..) => {
            Err(ReconcileError::AmbiguousLocalTime { local, zone: zone.name().to_string() })
        }
    }
}

/// The calendar day in `zone` containing `local`, as a UTC window.
pub fn day_window(local: NaiveDateTime, zone: Tz) -> Result<MeetingWindow, ReconcileError> {
    let day = local.date();
    let next = day
        .checked_add_days(Days::new(1))
        .ok_or_else(|| ReconcileError::InvalidMeeting(format!("date {day} out of range")))?;

    Ok(MeetingWindow { start: start_of_day(day, zone)?, end: start_of_day(next, zone)? })
}

/// First instant of `day` in `zone`; a few zones skip local midnight on
/// DST days, so the first valid hour is used instead.
fn start_of_day(day: NaiveDate, zone: Tz) -> Result<DateTime<Utc>, ReconcileError> {
    (0..24)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .find_map(|time| zone.from_local_datetime(&day.and_time(time)).earliest())
        .map(|instant| instant.with_timezone(&Utc))
        .ok_or_else(|| ReconcileError::NonexistentLocalTime {
            local: day.and_time(NaiveTime::MIN),
            zone: zone.name().to_string(),
        })
}

/// Resolve a desired meeting to absolute instants.
pub fn resolve_meeting(
    desired: &DesiredMeeting,
    default_zone: Tz,
) -> Result<(ResolvedMeeting, MeetingWindow), ReconcileError> {
    if desired.organizer.trim().is_empty() {
        return Err(ReconcileError::InvalidMeeting("organizer is empty".into()));
    }
    if desired.end <= desired.start {
        return Err(ReconcileError::InvalidMeeting(format!(
            "end {} is not after start {}",
            desired.end, desired.start
        )));
    }

    let zone = resolve_zone(desired.timezone.as_deref(), default_zone)?;
    let start = to_utc(desired.start, zone)?;
    let end = to_utc(desired.end, zone)?;
    let window = day_window(desired.start, zone)?;

    let resolved = ResolvedMeeting {
        subject: desired.subject.clone(),
        organizer: desired.organizer.clone(),
        start,
        end,
        timezone: zone.name().to_string(),
        location: desired.location.clone(),
        attendees: desired.attendees.clone(),
        body: desired.body.clone(),
    };
    Ok((resolved, window))
}
