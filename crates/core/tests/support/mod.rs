//! Shared test helpers for `changecast-core` integration tests.
//!
//! In-memory provider fakes so that tests can focus on behaviour instead of
//! wiring.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use changecast_core::{CalendarProvider, DirectoryProvider, ProviderError, TokenSupplier};
use changecast_domain::{
    DesiredMeeting, DirectoryPage, DirectoryUser, ExistingMeeting, IdempotencyKey, MeetingWindow,
    ResolvedMeeting,
};
use chrono::{NaiveDate, NaiveDateTime};

/// Calendar that keeps events in memory and counts every call.
///
/// Failures queued with [`InMemoryCalendar::fail_next`] are returned by the
/// next calls in order, whichever operation they are.
#[derive(Default)]
pub struct InMemoryCalendar {
    events: Mutex<Vec<(String, ExistingMeeting)>>,
    failures: Mutex<VecDeque<ProviderError>>,
    next_id: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
    queries: AtomicUsize,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event on `organizer`'s calendar.
    pub fn with_event(self, organizer: &str, event: ExistingMeeting) -> Self {
        self.events.lock().unwrap().push((organizer.to_string(), event));
        self
    }

    pub fn fail_next(&self, error: ProviderError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn events(&self) -> Vec<ExistingMeeting> {
        self.events.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn event(&self, id: &str) -> Option<ExistingMeeting> {
        self.events().into_iter().find(|e| e.id == id)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> Result<(), ProviderError> {
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn to_existing(id: String, meeting: &ResolvedMeeting) -> ExistingMeeting {
    ExistingMeeting {
        id,
        subject: meeting.subject.as_str().to_string(),
        start: meeting.start,
        end: meeting.end,
        location: meeting.location.clone(),
        attendees: meeting.attendees.clone(),
        body: meeting.body.clone(),
    }
}

#[async_trait]
impl CalendarProvider for InMemoryCalendar {
    async fn create_event(
        &self,
        _token: &str,
        meeting: &ResolvedMeeting,
    ) -> Result<String, ProviderError> {
        self.take_failure()?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        let id = format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.events
            .lock()
            .unwrap()
            .push((meeting.organizer.clone(), to_existing(id.clone(), meeting)));
        Ok(id)
    }

    async fn update_event(
        &self,
        _token: &str,
        event_id: &str,
        meeting: &ResolvedMeeting,
    ) -> Result<(), ProviderError> {
        self.take_failure()?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut events = self.events.lock().unwrap();
        let slot = events
            .iter_mut()
            .find(|(_, e)| e.id == event_id)
            .ok_or_else(|| ProviderError::NotFound(event_id.to_string()))?;
        slot.1 = to_existing(event_id.to_string(), meeting);
        Ok(())
    }

    async fn query_events_by_window(
        &self,
        _token: &str,
        organizer: &str,
        window: MeetingWindow,
    ) -> Result<Vec<ExistingMeeting>, ProviderError> {
        self.take_failure()?;
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, e)| {
                owner == organizer && e.start < window.end && e.end > window.start
            })
            .map(|(_, e)| e.clone())
            .collect())
    }
}

/// Token supplier that counts how often it is asked.
#[derive(Default)]
pub struct CountingTokens {
    calls: AtomicUsize,
}

impl CountingTokens {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSupplier for CountingTokens {
    async fn access_token(&self) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("test-token".to_string())
    }
}

/// Directory serving fixed pages chained by `page-N` tokens.
pub struct PagedDirectory {
    pages: Vec<DirectoryPage>,
    failures: Mutex<VecDeque<ProviderError>>,
    requests: AtomicUsize,
}

impl PagedDirectory {
    /// `sizes[i]` users on page `i`; the last page has no next token.
    pub fn new(sizes: &[usize]) -> Self {
        let mut counter = 0;
        let pages = sizes
            .iter()
            .enumerate()
            .map(|(page, &size)| {
                let users = (0..size)
                    .map(|_| {
                        counter += 1;
                        user(counter)
                    })
                    .collect();
                let next_page_token =
                    (page + 1 < sizes.len()).then(|| format!("page-{}", page + 1));
                DirectoryPage { users, next_page_token }
            })
            .collect();
        Self::from_pages(pages)
    }

    pub fn from_pages(pages: Vec<DirectoryPage>) -> Self {
        Self { pages, failures: Mutex::new(VecDeque::new()), requests: AtomicUsize::new(0) }
    }

    pub fn fail_next(&self, error: ProviderError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryProvider for PagedDirectory {
    async fn list_users(&self, page_token: Option<&str>) -> Result<DirectoryPage, ProviderError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let index = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| ProviderError::Validation(format!("bad token {token}")))?,
        };
        self.pages.get(index).cloned().ok_or_else(|| ProviderError::NotFound(format!("page {index}")))
    }

    async fn get_user(&self, id: &str) -> Result<DirectoryUser, ProviderError> {
        self.pages
            .iter()
            .flat_map(|p| p.users.iter())
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }
}

pub fn user(n: usize) -> DirectoryUser {
    DirectoryUser {
        id: format!("u{n}"),
        email: format!("user{n}@example.com"),
        display_name: Some(format!("User {n}")),
        department: None,
    }
}

pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
}

/// A one-hour UTC meeting on 2024-05-06 starting at 14:00.
pub fn desired_meeting(subject: &str) -> DesiredMeeting {
    DesiredMeeting {
        subject: IdempotencyKey::new(subject).unwrap(),
        organizer: "ops@example.com".to_string(),
        start: local(2024, 5, 6, 14, 0, 0),
        end: local(2024, 5, 6, 15, 0, 0),
        timezone: Some("UTC".to_string()),
        location: Some("Bridge".to_string()),
        attendees: vec!["alice@example.com".to_string(), "bob@example.com".to_string()],
        body: "Change window".to_string(),
    }
}
