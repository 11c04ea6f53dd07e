//! Check-in window evaluation.
//!
//! An occurrence's check-in window opens `buffer` before it starts and closes
//! `buffer` after it ends. Recurring events stay checkable for a further
//! `grace` period after the window closes; one-off events never do.
//!
//! The "Ongoing"/"Completed" badge flips at the occurrence end, without the
//! trailing buffer, so an event can show as completed while check-in is still
//! open.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::errors::WindowError;
use super::occurrence::OccurrenceResolver;

/// The parts of an event that determine its check-in window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSchedule {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInState {
    Upcoming,
    InWindow,
    /// Past the window but inside the recurring-event grace period
    RecentlyClosed,
    Closed,
}

impl CheckInState {
    pub fn permits_check_in(self) -> bool {
        matches!(self, CheckInState::InWindow | CheckInState::RecentlyClosed)
    }
}

/// Status badge shown next to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Upcoming,
    Ongoing,
    Completed,
}

/// Resolved instants for one occurrence, all in the civil offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckInWindow {
    pub occurrence_start: DateTime<FixedOffset>,
    pub occurrence_end: DateTime<FixedOffset>,
    pub window_start: DateTime<FixedOffset>,
    pub window_end: DateTime<FixedOffset>,
    /// Last instant a recurring occurrence can be checked into. `None` for one-off events.
    pub grace_end: Option<DateTime<FixedOffset>>,
}

impl CheckInWindow {
    pub fn classify(&self, now: DateTime<Utc>) -> CheckInState {
        if now < self.window_start {
            CheckInState::Upcoming
        } else if now <= self.window_end {
            CheckInState::InWindow
        } else if self.grace_end.is_some_and(|grace_end| now <= grace_end) {
            CheckInState::RecentlyClosed
        } else {
            CheckInState::Closed
        }
    }

    pub fn display_status(&self, now: DateTime<Utc>) -> DisplayStatus {
        if now < self.window_start {
            DisplayStatus::Upcoming
        } else if now <= self.occurrence_end {
            DisplayStatus::Ongoing
        } else {
            DisplayStatus::Completed
        }
    }
}

/// Buffer and grace settings plus the resolver that anchors them.
#[derive(Debug, Clone, Copy)]
pub struct WindowPolicy {
    pub resolver: OccurrenceResolver,
    pub buffer: Duration,
    pub grace: Duration,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            resolver: OccurrenceResolver::default(),
            buffer: Duration::hours(2),
            grace: Duration::days(7),
        }
    }
}

impl WindowPolicy {
    pub fn window(&self, schedule: &EventSchedule) -> Result<CheckInWindow, WindowError> {
        let (occurrence_start, occurrence_end) = self.resolver.occurrence_bounds(schedule)?;
        let window_end = occurrence_end + self.buffer;

        Ok(CheckInWindow {
            occurrence_start,
            occurrence_end,
            window_start: occurrence_start - self.buffer,
            window_end,
            grace_end: schedule.is_recurring.then(|| window_end + self.grace),
        })
    }

    pub fn classify(
        &self,
        schedule: &EventSchedule,
        now: DateTime<Utc>,
    ) -> Result<CheckInState, WindowError> {
        Ok(self.window(schedule)?.classify(now))
    }

    /// Whether check-in is permitted at `now`. Malformed schedules are never eligible.
    pub fn can_check_in(&self, schedule: &EventSchedule, now: DateTime<Utc>) -> bool {
        match self.classify(schedule, now) {
            Ok(state) => state.permits_check_in(),
            Err(e) => {
                warn!(error = %e, "Treating malformed event window as closed for check-in");
                false
            }
        }
    }

    pub fn display_status(
        &self,
        schedule: &EventSchedule,
        now: DateTime<Utc>,
    ) -> Result<DisplayStatus, WindowError> {
        Ok(self.window(schedule)?.display_status(now))
    }

    /// Evaluate an event for a listing. Malformed schedules are kept, marked ineligible.
    pub fn evaluate<T>(&self, event: T, schedule: &EventSchedule, now: DateTime<Utc>) -> ListedEvent<T> {
        match self.window(schedule) {
            Ok(window) => {
                let state = window.classify(now);
                ListedEvent {
                    event,
                    window: Some(window),
                    state: Some(state),
                    display_status: Some(window.display_status(now)),
                    can_check_in: state.permits_check_in(),
                }
            }
            Err(e) => {
                warn!(error = %e, "Listing event with malformed window as ineligible");
                ListedEvent {
                    event,
                    window: None,
                    state: None,
                    display_status: None,
                    can_check_in: false,
                }
            }
        }
    }
}

/// Classify with the default policy.
pub fn classify(schedule: &EventSchedule, now: DateTime<Utc>) -> Result<CheckInState, WindowError> {
    WindowPolicy::default().classify(schedule, now)
}

/// Check-in eligibility with the default policy.
pub fn can_check_in(schedule: &EventSchedule, now: DateTime<Utc>) -> bool {
    WindowPolicy::default().can_check_in(schedule, now)
}

/// An event together with its evaluated window.
#[derive(Debug, Clone, Serialize)]
pub struct ListedEvent<T> {
    pub event: T,
    pub window: Option<CheckInWindow>,
    pub state: Option<CheckInState>,
    pub display_status: Option<DisplayStatus>,
    pub can_check_in: bool,
}

impl<T> ListedEvent<T> {
    fn listing_rank(&self) -> u8 {
        match (self.state, self.window) {
            (Some(CheckInState::InWindow), _) => 0,
            (_, Some(_)) => 1,
            (_, None) => 2,
        }
    }
}

/// Events in their window first, then the rest by window end, most recent first.
/// Events with malformed windows go last.
pub fn listing_order<T>(a: &ListedEvent<T>, b: &ListedEvent<T>) -> Ordering {
    a.listing_rank().cmp(&b.listing_rank()).then_with(|| {
        b.window
            .map(|w| w.window_end)
            .cmp(&a.window.map(|w| w.window_end))
    })
}

pub fn order_for_listing<T>(events: &mut [ListedEvent<T>]) {
    events.sort_by(listing_order);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn event(
        start_date: &str,
        end_date: &str,
        start_time: Option<&str>,
        end_time: Option<&str>,
        is_recurring: bool,
    ) -> EventSchedule {
        EventSchedule {
            start_date: date(start_date),
            end_date: date(end_date),
            start_time: start_time.map(String::from),
            end_time: end_time.map(String::from),
            is_recurring,
            category: "service".to_string(),
        }
    }

    /// Tuesday service, Feb 27 17:00-19:00
    fn weekly_service(is_recurring: bool) -> EventSchedule {
        event("2024-02-27", "2024-02-27", Some("17:00"), Some("19:00"), is_recurring)
    }

    const NOW: &str = "2024-03-05T12:00:00+08:00";

    #[test]
    fn test_one_off_window_bounds() {
        let schedule = event("2024-03-05", "2024-03-05", Some("14:00"), Some("16:00"), false);
        let window = WindowPolicy::default().window(&schedule).unwrap();

        assert_eq!(window.window_start.to_rfc3339(), "2024-03-05T12:00:00+08:00");
        assert_eq!(window.window_end.to_rfc3339(), "2024-03-05T18:00:00+08:00");
        assert_eq!(window.grace_end, None);
        assert_eq!(classify(&schedule, at(NOW)).unwrap(), CheckInState::InWindow);
        assert!(can_check_in(&schedule, at(NOW)));
    }

    #[test]
    fn test_window_start_is_inclusive() {
        let schedule = event("2024-03-05", "2024-03-05", Some("14:00"), Some("16:00"), false);

        assert!(can_check_in(&schedule, at("2024-03-05T12:00:00+08:00")));
        assert_eq!(
            classify(&schedule, at("2024-03-05T11:59:59+08:00")).unwrap(),
            CheckInState::Upcoming
        );
        assert!(!can_check_in(&schedule, at("2024-03-05T11:59:59+08:00")));
    }

    #[test]
    fn test_window_end_is_inclusive() {
        let schedule = event("2024-03-05", "2024-03-05", Some("14:00"), Some("16:00"), false);

        assert!(can_check_in(&schedule, at("2024-03-05T18:00:00+08:00")));
        assert!(!can_check_in(&schedule, at("2024-03-05T18:00:01+08:00")));
    }

    #[test]
    fn test_now_in_other_offset_is_the_same_instant() {
        let schedule = event("2024-03-05", "2024-03-05", Some("14:00"), Some("16:00"), false);

        assert!(can_check_in(&schedule, at("2024-03-05T04:00:00Z")));
        assert!(!can_check_in(&schedule, at("2024-03-05T03:59:59Z")));
    }

    #[test]
    fn test_recurring_grace_within_seven_days() {
        let schedule = weekly_service(true);
        let window = WindowPolicy::default().window(&schedule).unwrap();
        assert_eq!(window.window_end.to_rfc3339(), "2024-02-27T21:00:00+08:00");

        assert_eq!(
            classify(&schedule, at(NOW)).unwrap(),
            CheckInState::RecentlyClosed
        );
        assert!(can_check_in(&schedule, at(NOW)));
    }

    #[test]
    fn test_recurring_grace_expires() {
        let schedule = weekly_service(true);
        let later = at("2024-03-06T12:00:00+08:00");

        assert_eq!(classify(&schedule, later).unwrap(), CheckInState::Closed);
        assert!(!can_check_in(&schedule, later));
    }

    #[test]
    fn test_recurring_grace_boundary_is_inclusive() {
        let schedule = weekly_service(true);

        assert!(can_check_in(&schedule, at("2024-03-05T21:00:00+08:00")));
        assert!(!can_check_in(&schedule, at("2024-03-05T21:00:01+08:00")));
    }

    #[test]
    fn test_one_off_never_grace_extends() {
        let schedule = weekly_service(false);

        assert_eq!(classify(&schedule, at(NOW)).unwrap(), CheckInState::Closed);
        assert!(!can_check_in(&schedule, at(NOW)));
        assert!(!can_check_in(&schedule, at("2024-02-27T21:00:01+08:00")));
    }

    #[test]
    fn test_recurring_ignores_stored_end_date() {
        // Stored end_date says the series runs to March 12; the occurrence is still Feb 27
        let schedule = event("2024-02-27", "2024-03-12", Some("17:00"), Some("19:00"), true);

        assert_eq!(
            classify(&schedule, at("2024-03-08T18:00:00+08:00")).unwrap(),
            CheckInState::Closed
        );

        // The same dates on a one-off event span the whole range
        let one_off = event("2024-02-27", "2024-03-12", Some("17:00"), Some("19:00"), false);
        assert_eq!(
            classify(&one_off, at("2024-03-08T18:00:00+08:00")).unwrap(),
            CheckInState::InWindow
        );
    }

    #[test]
    fn test_all_day_event_without_times() {
        let schedule = event("2024-03-05", "2024-03-05", None, None, false);
        let window = WindowPolicy::default().window(&schedule).unwrap();

        assert_eq!(window.window_start.to_rfc3339(), "2024-03-04T22:00:00+08:00");
        assert_eq!(window.window_end.to_rfc3339(), "2024-03-05T02:00:00+08:00");
        assert!(!can_check_in(&schedule, at(NOW)));
    }

    #[test]
    fn test_malformed_time_fails_closed() {
        let schedule = event("2024-03-05", "2024-03-05", Some("2pm"), Some("16:00"), false);

        assert!(matches!(
            classify(&schedule, at(NOW)),
            Err(WindowError::InvalidEventWindow(_))
        ));
        assert!(!can_check_in(&schedule, at(NOW)));
    }

    #[test]
    fn test_inverted_window_fails_closed() {
        let schedule = event("2024-03-06", "2024-03-05", Some("14:00"), Some("16:00"), false);
        assert!(!can_check_in(&schedule, at(NOW)));
    }

    #[test]
    fn test_recurring_overnight_session_is_not_checkable() {
        // Recurring occurrences end on their start date, so 20:00-00:30 ends before it starts
        let schedule = event("2024-03-05", "2024-03-06", Some("20:00"), Some("00:30"), true);
        let policy = WindowPolicy::default();

        assert!(matches!(
            policy.window(&schedule),
            Err(WindowError::InvalidEventWindow(_))
        ));
        for now in [
            "2024-03-05T19:00:00+08:00",
            "2024-03-05T21:00:00+08:00",
            "2024-03-06T00:15:00+08:00",
        ] {
            assert!(!policy.can_check_in(&schedule, at(now)), "checkable at {now}");
        }

        let listed = policy.evaluate((), &schedule, at("2024-03-05T21:00:00+08:00"));
        assert!(listed.window.is_none());
        assert!(!listed.can_check_in);
    }

    #[test]
    fn test_display_completes_before_check_in_closes() {
        let policy = WindowPolicy::default();
        let schedule = event("2024-03-05", "2024-03-05", Some("14:00"), Some("16:00"), false);

        assert_eq!(
            policy.display_status(&schedule, at("2024-03-05T11:00:00+08:00")).unwrap(),
            DisplayStatus::Upcoming
        );
        assert_eq!(
            policy.display_status(&schedule, at("2024-03-05T12:30:00+08:00")).unwrap(),
            DisplayStatus::Ongoing
        );
        assert_eq!(
            policy.display_status(&schedule, at("2024-03-05T16:00:00+08:00")).unwrap(),
            DisplayStatus::Ongoing
        );

        let after_end = at("2024-03-05T17:00:00+08:00");
        assert_eq!(
            policy.display_status(&schedule, after_end).unwrap(),
            DisplayStatus::Completed
        );
        assert!(policy.can_check_in(&schedule, after_end));
    }

    #[test]
    fn test_custom_policy() {
        let policy = WindowPolicy {
            buffer: Duration::minutes(30),
            grace: Duration::days(1),
            ..WindowPolicy::default()
        };
        let schedule = weekly_service(true);

        assert!(!policy.can_check_in(&schedule, at("2024-02-27T16:29:00+08:00")));
        assert!(policy.can_check_in(&schedule, at("2024-02-27T16:30:00+08:00")));
        assert!(policy.can_check_in(&schedule, at("2024-02-28T19:30:00+08:00")));
        assert!(!policy.can_check_in(&schedule, at("2024-02-28T19:30:01+08:00")));
    }

    #[test]
    fn test_listing_order() {
        let policy = WindowPolicy::default();
        let now = at(NOW);

        let mut listed = vec![
            policy.evaluate("old", &event("2024-02-01", "2024-02-01", Some("10:00"), Some("11:00"), false), now),
            policy.evaluate("broken", &event("2024-03-05", "2024-03-05", Some("nope"), None, false), now),
            policy.evaluate("future", &event("2024-03-20", "2024-03-20", Some("10:00"), Some("11:00"), false), now),
            policy.evaluate("now", &event("2024-03-05", "2024-03-05", Some("13:00"), Some("15:00"), false), now),
            policy.evaluate("recent", &weekly_service(true), now),
        ];
        order_for_listing(&mut listed);

        let order: Vec<&str> = listed.iter().map(|l| l.event).collect();
        assert_eq!(order, vec!["now", "future", "recent", "old", "broken"]);
        assert!(listed[0].can_check_in);
        assert!(listed[2].can_check_in);
        assert!(!listed[4].can_check_in);
    }

    #[test]
    fn test_listing_order_comparator_matches_sort() {
        let policy = WindowPolicy::default();
        let now = at(NOW);
        let in_window = policy.evaluate(1, &event("2024-03-05", "2024-03-05", Some("13:00"), None, false), now);
        let closed = policy.evaluate(2, &weekly_service(false), now);

        assert_eq!(listing_order(&in_window, &closed), Ordering::Less);
        assert_eq!(listing_order(&closed, &in_window), Ordering::Greater);
    }
}
