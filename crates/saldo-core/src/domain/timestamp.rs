use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::domain::Day;
use crate::ValidationError;

/// RFC3339 instant guaranteed to be UTC.
///
/// All event timestamps in the engine are UTC; offsets other than `Z` are
/// rejected at the boundary rather than silently converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(value))
    }

    /// Internal constructor for instants already known to carry the UTC offset.
    pub(crate) const fn from_utc(value: OffsetDateTime) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// The UTC calendar day this instant falls on.
    pub fn day(self) -> Day {
        Day::new(self.0.date())
    }

    /// This instant shifted backward by `days` whole days.
    pub fn minus_days(self, days: u32) -> Result<Self, ValidationError> {
        self.0
            .checked_sub(Duration::days(i64::from(days)))
            .map(Self)
            .ok_or(ValidationError::DayOutOfRange {
                days: -i64::from(days),
            })
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .expect("UtcDateTime must be RFC3339 formattable")
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcDateTime::parse("2021-10-01T12:30:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2021-10-01T12:30:00Z");
    }

    #[test]
    fn rejects_non_utc_timestamp() {
        let err = UtcDateTime::parse("2021-10-01T01:00:00+01:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn truncates_to_day() {
        let parsed = UtcDateTime::parse("2021-10-01T23:59:59Z").expect("must parse");
        assert_eq!(parsed.day().to_string(), "2021-10-01");
    }

    #[test]
    fn shifts_backward_in_whole_days() {
        let parsed = UtcDateTime::parse("2021-10-01T06:00:00Z").expect("must parse");
        let shifted = parsed.minus_days(30).expect("in range");
        assert_eq!(shifted.format_rfc3339(), "2021-09-01T06:00:00Z");
    }
}
