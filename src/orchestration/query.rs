//! Trip query validation and date handling.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::Deserialize;
use tracing::warn;

use super::{AggregatorError, Result};

/// Raw trip query as received from the web layer.
///
/// Fields are optional so that missing input is reported as a client error
/// by [`TripQuery::validate`] rather than by deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripQuery {
    pub start_destination: Option<String>,
    pub end_destination: Option<String>,
    pub depart_time: Option<String>,
}

impl TripQuery {
    pub fn new(
        start_destination: impl Into<String>,
        end_destination: impl Into<String>,
        depart_time: impl Into<String>,
    ) -> Self {
        Self {
            start_destination: Some(start_destination.into()),
            end_destination: Some(end_destination.into()),
            depart_time: Some(depart_time.into()),
        }
    }

    /// Check that every field is present and non-empty.
    pub fn validate(&self) -> Result<Trip> {
        match (
            non_empty(&self.start_destination),
            non_empty(&self.end_destination),
            non_empty(&self.depart_time),
        ) {
            (Some(start), Some(end), Some(depart_time)) => Ok(Trip {
                start: start.to_string(),
                end: end.to_string(),
                depart_time: depart_time.to_string(),
            }),
            _ => {
                warn!(
                    start = ?self.start_destination,
                    end = ?self.end_destination,
                    depart_time = ?self.depart_time,
                    "Missing required trip fields"
                );
                Err(AggregatorError::ClientInput(
                    "startDestination, endDestination and departTime are required".to_string(),
                ))
            }
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// A validated trip query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub start: String,
    pub end: String,
    pub depart_time: String,
}

impl Trip {
    /// Parse the departure time, failing with a client error when it is not a date.
    pub fn departure(&self) -> Result<DateTime<Utc>> {
        parse_instant(&self.depart_time).ok_or_else(|| {
            warn!(depart_time = %self.depart_time, "Invalid date format");
            AggregatorError::ClientInput(format!(
                "departTime is not a valid date: {}",
                self.depart_time
            ))
        })
    }
}

/// Parse an ISO-8601 date or date-time.
///
/// Accepts RFC 3339 (any offset), `YYYY-MM-DDTHH:MM[:SS[.fff]]` read as UTC,
/// and `YYYY-MM-DD` as midnight UTC.
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Calendar date of an instant, as used in the weather path.
pub fn calendar_date(instant: &DateTime<Utc>) -> String {
    instant.date_naive().format("%Y-%m-%d").to_string()
}

/// Minutes since UTC midnight of an ISO date-time.
pub fn minutes_of_day(s: &str) -> Option<u32> {
    parse_instant(s).map(|dt| dt.hour() * 60 + dt.minute())
}

/// Minutes since midnight of an `HH:MM` (or `HH:MM:SS`) clock time.
///
/// Hours must be below 24 and minutes and seconds below 60.
pub fn clock_minutes(s: &str) -> Option<u32> {
    let fields: Vec<&str> = s.trim().split(':').collect();
    let (hours, minutes, seconds) = match fields.as_slice() {
        [h, m] => (*h, *m, None),
        [h, m, sec] => (*h, *m, Some(*sec)),
        _ => return None,
    };

    let hours: u32 = hours.trim().parse().ok()?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    if let Some(seconds) = seconds {
        let seconds: u32 = seconds.trim().parse().ok()?;
        if seconds >= 60 {
            return None;
        }
    }
    Some(hours * 60 + minutes)
}
