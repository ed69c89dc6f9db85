//! Sparse balance events to dense daily end-of-day series.
//!
//! Balances arrive as irregular notification events per account. The
//! reconstructor turns them into one value (or explicit unknown) per UTC
//! calendar day by taking the last report of each day and carrying it
//! forward, bounded by a staleness cutoff. Unknown days stay unknown; the
//! engine never fabricates a zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{BalanceEvent, Day};
use crate::ValidationError;

/// How many days a balance observation may be carried forward before the
/// day is treated as unknown. `max_carry_days == 0` disables carrying: only
/// the report day itself gets a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessPolicy {
    pub max_carry_days: u32,
}

impl StalenessPolicy {
    pub const NO_CARRY: Self = Self::new(0);

    pub const fn new(max_carry_days: u32) -> Self {
        Self { max_carry_days }
    }
}

/// Dense end-of-day series for one account over an inclusive day range.
///
/// Every day in `[start, end]` holds either a known value (observed or
/// forward-carried) or an explicit unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    start: Day,
    end: Day,
    values: Vec<Option<f64>>,
}

impl DailySeries {
    /// Reconstruct the series for one account from its unordered events.
    ///
    /// Events are sorted by timestamp; the last event of each calendar day
    /// wins (end-of-day value). Observations before `start` may seed the
    /// carry into the range, still subject to the staleness bound measured
    /// from the actual observation day. An empty event list yields an
    /// entirely unknown series, not an error.
    pub fn reconstruct(
        events: &[BalanceEvent],
        start: Day,
        end: Day,
        policy: StalenessPolicy,
    ) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidDayRange);
        }

        let mut sorted: Vec<&BalanceEvent> = events.iter().collect();
        sorted.sort_by_key(|e| e.ts);

        // Last report per day; later timestamps overwrite earlier ones.
        let mut end_of_day: BTreeMap<Day, f64> = BTreeMap::new();
        for event in sorted {
            end_of_day.insert(event.ts.day(), event.balance);
        }

        let len = usize::try_from(end.days_since(start) + 1)
            .map_err(|_| ValidationError::InvalidDayRange)?;
        let mut values = Vec::with_capacity(len);

        let mut observations = end_of_day.iter().peekable();
        let mut last_seen: Option<(Day, f64)> = None;
        for day in start.until(end) {
            while let Some((&obs_day, &value)) = observations.peek() {
                if obs_day > day {
                    break;
                }
                last_seen = Some((obs_day, value));
                observations.next();
            }

            let carried = match last_seen {
                Some((obs_day, value))
                    if day.days_since(obs_day) <= i64::from(policy.max_carry_days) =>
                {
                    Some(value)
                }
                _ => None,
            };
            values.push(carried);
        }

        Ok(Self { start, end, values })
    }

    pub(crate) fn from_values(start: Day, end: Day, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(values.len() as i64, end.days_since(start) + 1);
        Self { start, end, values }
    }

    pub const fn start(&self) -> Day {
        self.start
    }

    pub const fn end(&self) -> Day {
        self.end
    }

    pub fn len_days(&self) -> usize {
        self.values.len()
    }

    /// Value on `day`, `None` when unknown or outside the range.
    pub fn get(&self, day: Day) -> Option<f64> {
        let index = day.days_since(self.start);
        if index < 0 {
            return None;
        }
        self.values.get(index as usize).copied().flatten()
    }

    /// Iterate every day with its (possibly unknown) value.
    pub fn days(&self) -> impl Iterator<Item = (Day, Option<f64>)> + '_ {
        self.start.until(self.end).zip(self.values.iter().copied())
    }

    /// Iterate only days with known values.
    pub fn known(&self) -> impl Iterator<Item = (Day, f64)> + '_ {
        self.days().filter_map(|(day, v)| v.map(|v| (day, v)))
    }

    pub fn is_fully_unknown(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}
