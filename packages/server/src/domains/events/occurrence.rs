//! Occurrence instants in the deployment's civil timezone.
//!
//! Display logic and check-in eligibility both resolve occurrences through
//! `OccurrenceResolver` so they can never disagree about when an occurrence
//! starts or ends.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

use super::errors::WindowError;
use super::window::EventSchedule;

/// UTC+8. The deployment's users all live in one zone without daylight saving.
pub const CIVIL_OFFSET: FixedOffset = match FixedOffset::east_opt(8 * 3600) {
    Some(offset) => offset,
    None => panic!("civil offset out of range"),
};

/// Parse a wall-clock time as entered by organisers (`HH:MM` or `HH:MM:SS`).
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, WindowError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| WindowError::InvalidEventWindow(format!("unparsable time {raw:?}")))
}

/// Optional time field; absent and blank both mean "not set".
fn parse_optional_time(raw: Option<&str>) -> Result<Option<NaiveTime>, WindowError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_time_of_day(value).map(Some),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceResolver {
    offset: FixedOffset,
}

impl Default for OccurrenceResolver {
    fn default() -> Self {
        Self::new(CIVIL_OFFSET)
    }
}

impl OccurrenceResolver {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// The instant `date` at `time` (midnight when absent) in the civil offset.
    pub fn resolve(
        &self,
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> Result<DateTime<FixedOffset>, WindowError> {
        let local = date.and_time(time.unwrap_or(NaiveTime::MIN));
        local
            .and_local_timezone(self.offset)
            .single()
            .ok_or_else(|| {
                WindowError::InvalidEventWindow(format!("{local} is not a valid local time"))
            })
    }

    /// Start and end of the occurrence an event schedule describes.
    ///
    /// - start: `start_date` at `start_time`
    /// - end (one-off): `end_date` at `end_time`, falling back to `start_time`
    /// - end (recurring): `start_date` at `end_time`, falling back to
    ///   `start_time`. Recurring templates are edited in place, so their
    ///   stored `end_date` is not trusted.
    pub fn occurrence_bounds(
        &self,
        schedule: &EventSchedule,
    ) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), WindowError> {
        let start_time = parse_optional_time(schedule.start_time.as_deref())?;
        let end_time = parse_optional_time(schedule.end_time.as_deref())?.or(start_time);

        let end_date = if schedule.is_recurring {
            schedule.start_date
        } else {
            schedule.end_date
        };

        let start = self.resolve(schedule.start_date, start_time)?;
        let end = self.resolve(end_date, end_time)?;

        if end < start {
            return Err(WindowError::InvalidEventWindow(format!(
                "occurrence ends ({end}) before it starts ({start})"
            )));
        }
        Ok((start, end))
    }
}
