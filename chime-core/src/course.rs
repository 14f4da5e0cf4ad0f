//! Weekly course model and occurrence projection.

use anyhow::{bail, Result};
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Recurring weekly class slot. `weekday` is ISO: 1 = Monday .. 7 = Sunday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub weekday: u8,

    /// Start of the slot as `"HH:MM"` (an optional `:SS` suffix is
    /// tolerated and dropped). Parsed fresh on every projection.
    pub start_time: String,

    #[serde(default)]
    pub location: String,
}

impl Course {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        weekday: u8,
        start_time: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weekday,
            start_time: start_time.into(),
            location: String::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=7).contains(&self.weekday) {
            return Err(format!("weekday {} out of range 1-7", self.weekday));
        }
        if let Err(e) = parse_start_time(&self.start_time) {
            return Err(e.to_string());
        }
        Ok(())
    }
}

fn parse_start_time(s: &str) -> Result<NaiveTime> {
    let t = NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| anyhow::anyhow!("invalid course start time '{s}': {e}"))?;
    // Seconds never participate in the window math.
    Ok(t.with_second(0).unwrap_or(t))
}

/// This week's occurrence of the course, relative to `now`.
///
/// Signed same-week offset: a Monday slot looked up on Wednesday resolves
/// two days into the past, never forward to next week. Elapsed occurrences
/// are the window logic's problem, not ours.
pub fn next_occurrence(course: &Course, now: NaiveDateTime) -> Result<NaiveDateTime> {
    if !(1..=7).contains(&course.weekday) {
        bail!(
            "course '{}': weekday {} out of range 1-7",
            course.id,
            course.weekday
        );
    }
    let start = parse_start_time(&course.start_time)?;

    // number_from_monday is 1..=7 with Sunday = 7.
    let current = i64::from(now.weekday().number_from_monday());
    let days_diff = i64::from(course.weekday) - current;

    Ok((now.date() + Duration::days(days_diff)).and_time(start))
}
