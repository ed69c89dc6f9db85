//! Combine per-account series and events into user-level results.
//!
//! Aggregation is keyed by [`AccountKey`], so accounts are never double
//! counted, and every operation here is order-independent across accounts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{AccountKey, BalanceEvent, Outcome, Window};
use crate::series::DailySeries;
use crate::ValidationError;

/// How a day with some accounts unknown contributes to the daily total.
///
/// This is a real, caller-visible policy choice; there is deliberately no
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// A day is known when at least one account is known; unknown accounts
    /// contribute nothing that day.
    Zero,
    /// A day is known only when every account is known; otherwise the total
    /// for that day is unknown.
    Strict,
}

/// Group balance events by account, the unit of series reconstruction.
pub fn group_by_account(events: &[BalanceEvent]) -> BTreeMap<AccountKey, Vec<BalanceEvent>> {
    let mut grouped: BTreeMap<AccountKey, Vec<BalanceEvent>> = BTreeMap::new();
    for event in events {
        grouped
            .entry(event.account.clone())
            .or_default()
            .push(event.clone());
    }
    grouped
}

/// Sum per-account daily series into one user-level daily series.
///
/// All series must cover the same day range. The result is commutative and
/// associative over the account list.
pub fn sum_across_accounts(
    series: &[DailySeries],
    policy: MissingPolicy,
) -> Result<DailySeries, ValidationError> {
    let first = series.first().ok_or(ValidationError::EmptySeriesSet)?;
    if series
        .iter()
        .any(|s| s.start() != first.start() || s.end() != first.end())
    {
        return Err(ValidationError::SeriesRangeMismatch);
    }

    let mut totals: Vec<Option<f64>> = Vec::with_capacity(first.len_days());
    for day in first.start().until(first.end()) {
        let mut sum = 0.0;
        let mut known = 0usize;
        for account in series {
            if let Some(value) = account.get(day) {
                sum += value;
                known += 1;
            }
        }

        let value = match policy {
            MissingPolicy::Zero if known > 0 => Some(sum),
            MissingPolicy::Strict if known == series.len() => Some(sum),
            _ => None,
        };
        totals.push(value);
    }

    Ok(DailySeries::from_values(first.start(), first.end(), totals))
}

/// Sum the most recent observation per account within the window.
///
/// Operates directly on raw events, not on reconstructed series: an account
/// with no observation inside the window is stale and excluded from the sum
/// entirely. No qualifying account yields `Absent`, never `0`.
pub fn latest_per_account(events: &[BalanceEvent], window: &Window) -> Outcome {
    let mut latest: BTreeMap<&AccountKey, &BalanceEvent> = BTreeMap::new();
    for event in events {
        if !window.contains(event.ts) {
            continue;
        }
        match latest.get(&event.account) {
            Some(current) if current.ts > event.ts => {}
            _ => {
                latest.insert(&event.account, event);
            }
        }
    }

    if latest.is_empty() {
        return Outcome::Absent;
    }
    Outcome::Value(latest.values().map(|e| e.balance).sum())
}

/// Sum the lowest observation per account within the window.
///
/// Like [`latest_per_account`], this operates on raw events rather than
/// reconstructed series: only observations inside the window participate,
/// an account with none is excluded, and no qualifying account yields
/// `Absent`, never `0`.
pub fn min_per_account(events: &[BalanceEvent], window: &Window) -> Outcome {
    let mut minima: BTreeMap<&AccountKey, f64> = BTreeMap::new();
    for event in events {
        if !window.contains(event.ts) {
            continue;
        }
        minima
            .entry(&event.account)
            .and_modify(|current| *current = current.min(event.balance))
            .or_insert(event.balance);
    }

    if minima.is_empty() {
        return Outcome::Absent;
    }
    Outcome::Value(minima.values().sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountCategory, AccountId, Day, InstitutionId, UtcDateTime};
    use crate::series::StalenessPolicy;

    fn key(institution: &str, account: &str) -> AccountKey {
        AccountKey::new(
            InstitutionId::parse(institution).expect("id"),
            AccountId::parse(account).expect("id"),
        )
    }

    fn balance(k: &AccountKey, ts: &str, amount: f64) -> BalanceEvent {
        BalanceEvent::new(
            k.clone(),
            UtcDateTime::parse(ts).expect("ts"),
            amount,
            AccountCategory::Depository,
        )
        .expect("event")
    }

    fn day(s: &str) -> Day {
        Day::parse(s).expect("day")
    }

    fn series(events: &[BalanceEvent], start: &str, end: &str) -> DailySeries {
        DailySeries::reconstruct(events, day(start), day(end), StalenessPolicy::new(10))
            .expect("series")
    }

    #[test]
    fn sums_carried_values_across_accounts() {
        let a = key("bank-a", "acct-1");
        let b = key("bank-b", "acct-1");
        // A reports day1: 100, day3: 50. B reports day1: 200.
        let series_a = series(
            &[
                balance(&a, "2021-09-01T10:00:00Z", 100.0),
                balance(&a, "2021-09-03T10:00:00Z", 50.0),
            ],
            "2021-09-01",
            "2021-09-03",
        );
        let series_b = series(
            &[balance(&b, "2021-09-01T10:00:00Z", 200.0)],
            "2021-09-01",
            "2021-09-03",
        );

        let total =
            sum_across_accounts(&[series_a, series_b], MissingPolicy::Zero).expect("total");
        assert_eq!(total.get(day("2021-09-01")), Some(300.0));
        assert_eq!(total.get(day("2021-09-02")), Some(300.0));
        assert_eq!(total.get(day("2021-09-03")), Some(250.0));
    }

    #[test]
    fn total_is_invariant_under_account_permutation() {
        let a = key("bank-a", "acct-1");
        let b = key("bank-b", "acct-1");
        let c = key("bank-b", "acct-2");
        let sa = series(
            &[balance(&a, "2021-09-01T10:00:00Z", 10.0)],
            "2021-09-01",
            "2021-09-05",
        );
        let sb = series(
            &[balance(&b, "2021-09-02T10:00:00Z", 20.0)],
            "2021-09-01",
            "2021-09-05",
        );
        let sc = series(
            &[balance(&c, "2021-09-03T10:00:00Z", 30.0)],
            "2021-09-01",
            "2021-09-05",
        );

        let forward = sum_across_accounts(
            &[sa.clone(), sb.clone(), sc.clone()],
            MissingPolicy::Zero,
        )
        .expect("total");
        let reversed = sum_across_accounts(&[sc, sb, sa], MissingPolicy::Zero).expect("total");
        assert_eq!(forward, reversed);
    }

    #[test]
    fn strict_policy_masks_days_with_unknown_accounts() {
        let a = key("bank-a", "acct-1");
        let b = key("bank-b", "acct-1");
        let sa = series(
            &[balance(&a, "2021-09-01T10:00:00Z", 100.0)],
            "2021-09-01",
            "2021-09-03",
        );
        // B only reports on day 2; day 1 is unknown for it.
        let sb = series(
            &[balance(&b, "2021-09-02T10:00:00Z", 200.0)],
            "2021-09-01",
            "2021-09-03",
        );

        let strict =
            sum_across_accounts(&[sa.clone(), sb.clone()], MissingPolicy::Strict).expect("total");
        assert_eq!(strict.get(day("2021-09-01")), None);
        assert_eq!(strict.get(day("2021-09-02")), Some(300.0));

        let lenient = sum_across_accounts(&[sa, sb], MissingPolicy::Zero).expect("total");
        assert_eq!(lenient.get(day("2021-09-01")), Some(100.0));
    }

    #[test]
    fn empty_series_set_is_rejected() {
        let err = sum_across_accounts(&[], MissingPolicy::Zero).expect_err("must fail");
        assert!(matches!(err, ValidationError::EmptySeriesSet));
    }

    #[test]
    fn mismatched_ranges_are_rejected() {
        let a = key("bank-a", "acct-1");
        let sa = series(&[balance(&a, "2021-09-01T10:00:00Z", 1.0)], "2021-09-01", "2021-09-03");
        let sb = series(&[], "2021-09-01", "2021-09-04");
        let err = sum_across_accounts(&[sa, sb], MissingPolicy::Zero).expect_err("must fail");
        assert!(matches!(err, ValidationError::SeriesRangeMismatch));
    }

    #[test]
    fn latest_sums_most_recent_per_account_and_skips_stale() {
        let a = key("bank-a", "acct-1");
        let b = key("bank-b", "acct-1");
        let window = Window::new("d0_90", day("2021-08-01"), day("2021-10-30")).expect("window");

        let events = vec![
            balance(&a, "2021-09-01T10:00:00Z", 100.0),
            balance(&a, "2021-10-15T10:00:00Z", 80.0),
            balance(&b, "2021-09-20T10:00:00Z", 40.0),
            // Outside the window: must not resurrect a stale account.
            balance(&b, "2021-11-02T10:00:00Z", 999.0),
        ];

        assert_eq!(latest_per_account(&events, &window), Outcome::Value(120.0));
    }

    #[test]
    fn minimum_sums_lowest_observation_per_account() {
        let a = key("bank-a", "acct-1");
        let b = key("bank-b", "acct-1");
        let window = Window::new("d0_30", day("2021-09-01"), day("2021-10-01")).expect("window");

        let events = vec![
            balance(&a, "2021-09-05T10:00:00Z", 100.0),
            balance(&a, "2021-09-18T10:00:00Z", 25.0),
            balance(&b, "2021-09-20T10:00:00Z", 40.0),
            // Outside the window: a lower value there must not count.
            balance(&b, "2021-08-10T10:00:00Z", 1.0),
        ];

        assert_eq!(min_per_account(&events, &window), Outcome::Value(65.0));
    }

    #[test]
    fn minimum_with_no_qualifying_account_is_absent() {
        let a = key("bank-a", "acct-1");
        let window = Window::new("d0_30", day("2021-09-01"), day("2021-10-01")).expect("window");
        let events = vec![balance(&a, "2021-07-01T10:00:00Z", 100.0)];
        assert_eq!(min_per_account(&events, &window), Outcome::Absent);
        assert_eq!(min_per_account(&[], &window), Outcome::Absent);
    }

    #[test]
    fn latest_with_no_qualifying_account_is_absent() {
        let a = key("bank-a", "acct-1");
        let window = Window::new("d0_30", day("2021-09-01"), day("2021-10-01")).expect("window");
        let events = vec![balance(&a, "2021-07-01T10:00:00Z", 100.0)];
        assert_eq!(latest_per_account(&events, &window), Outcome::Absent);
        assert_eq!(latest_per_account(&[], &window), Outcome::Absent);
    }
}
