use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::macros::format_description;
use time::Date;

use crate::domain::UtcDateTime;
use crate::ValidationError;

const DAY_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// A UTC calendar day.
///
/// Days are the engine's aggregation unit: end-of-day balances, staleness
/// cutoffs, and window boundaries are all expressed in whole UTC days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Day(Date);

impl Day {
    pub(crate) const fn new(date: Date) -> Self {
        Self(date)
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Date::parse(input, DAY_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDay {
                value: input.to_owned(),
            })
    }

    /// Midnight (00:00:00Z) at the start of this day.
    pub fn midnight(self) -> UtcDateTime {
        UtcDateTime::from_utc(self.0.midnight().assume_utc())
    }

    /// This day shifted by `days` (negative shifts backward).
    pub fn offset(self, days: i64) -> Result<Self, ValidationError> {
        let julian = i64::from(self.0.to_julian_day()) + days;
        let julian = i32::try_from(julian).map_err(|_| ValidationError::DayOutOfRange { days })?;
        Date::from_julian_day(julian)
            .map(Self)
            .map_err(|_| ValidationError::DayOutOfRange { days })
    }

    /// Whole days from `earlier` to `self` (negative when `self` precedes it).
    pub const fn days_since(self, earlier: Self) -> i64 {
        self.0.to_julian_day() as i64 - earlier.0.to_julian_day() as i64
    }

    /// Inclusive iterator over `[self, last]`. Empty when `last` precedes `self`.
    pub fn until(self, last: Self) -> DayRange {
        DayRange {
            next: self.0.to_julian_day(),
            last: last.0.to_julian_day(),
        }
    }
}

/// Inclusive day-range iterator.
#[derive(Debug, Clone)]
pub struct DayRange {
    next: i32,
    last: i32,
}

impl Iterator for DayRange {
    type Item = Day;

    fn next(&mut self) -> Option<Day> {
        if self.next > self.last {
            return None;
        }
        // Every julian value between two valid dates is itself a valid date.
        let date = Date::from_julian_day(self.next).expect("julian day within valid date range");
        self.next += 1;
        Some(Day(date))
    }
}

impl Display for Day {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let formatted = self
            .0
            .format(DAY_FORMAT)
            .expect("Day must be formattable as YYYY-MM-DD");
        f.write_str(&formatted)
    }
}

impl Serialize for Day {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Day {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
