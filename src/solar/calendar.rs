//! Simulated calendar date and wall time with minute resolution.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::core::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Longest clock step: one advance never moves the date by more than a day.
pub const MAX_STEP_MINUTES: i64 = 24 * 60;

/// A calendar date plus a time of day truncated to the minute.
///
/// All arithmetic goes through [`add_minutes`](Self::add_minutes), which
/// carries hour overflow into the date with calendar-correct month, year
/// and leap-year handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockStamp {
    at: NaiveDateTime,
}

impl ClockStamp {
    /// Build from an existing date and time. Seconds are dropped.
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        let time = time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time);
        Self { at: date.and_time(time) }
    }

    /// Parse `YYYY-MM-DD` and `HH:MM` (or `HH:MM:SS`, seconds truncated).
    pub fn parse(date: &str, time: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
            .map_err(|e| Error::DateTime(format!("date {date:?}: {e}")))?;
        let time = time.trim();
        let time = NaiveTime::parse_from_str(time, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
            .map_err(|e| Error::DateTime(format!("time {time:?}: {e}")))?;
        Ok(Self::new(date, time))
    }

    /// A new stamp `minutes` later. Negative values move backwards.
    pub fn add_minutes(self, minutes: i64) -> Self {
        Self { at: self.at + Duration::minutes(minutes) }
    }

    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.at.date()
    }

    #[inline]
    pub fn time(&self) -> NaiveTime {
        self.at.time()
    }

    /// `YYYY-MM-DD`
    pub fn date_string(&self) -> String {
        self.at.format(DATE_FORMAT).to_string()
    }

    /// `HH:MM`
    pub fn time_string(&self) -> String {
        self.at.format(TIME_FORMAT).to_string()
    }
}

impl fmt::Display for ClockStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.date_string(), self.time_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
