//! Balance metrics over reconstructed end-of-day series.
//!
//! Each metric exists twice: a pure `*_from_events` function over
//! already-fetched events, and an async wrapper that drives a
//! [`Collector`]. The wrappers fetch the spec's full day range; the
//! collector widens the start by its configured lookback so forward-fill
//! can seed the first window days.

use std::collections::BTreeSet;

use saldo_core::aggregate::{
    group_by_account, latest_per_account, min_per_account, sum_across_accounts,
};
use saldo_core::collector::Collector;
use saldo_core::domain::{
    AccountCategory, BalanceEvent, Day, Outcome, TransactionEvent, UserId, WindowSpec,
};
use saldo_core::reduce::{self, WindowOutcomes};
use saldo_core::series::{DailySeries, StalenessPolicy};
use saldo_core::MissingPolicy;

use crate::error::MetricError;

fn series_range(spec: &WindowSpec) -> Result<(Day, Day), MetricError> {
    let last = spec.overall_end().offset(-1)?;
    Ok((spec.overall_start(), last))
}

fn per_account_series(
    events: &[BalanceEvent],
    spec: &WindowSpec,
    staleness: StalenessPolicy,
) -> Result<Vec<DailySeries>, MetricError> {
    let (start, last) = series_range(spec)?;
    group_by_account(events)
        .values()
        .map(|account_events| {
            DailySeries::reconstruct(account_events, start, last, staleness).map_err(Into::into)
        })
        .collect()
}

fn total_series(
    events: &[BalanceEvent],
    spec: &WindowSpec,
    staleness: StalenessPolicy,
    missing: MissingPolicy,
) -> Result<Option<DailySeries>, MetricError> {
    let series = per_account_series(events, spec, staleness)?;
    if series.is_empty() {
        return Ok(None);
    }
    Ok(Some(sum_across_accounts(&series, missing)?))
}

/// Mean of the summed end-of-day balance across accounts, per window.
pub fn average_daily_balance_from_events(
    events: &[BalanceEvent],
    spec: &WindowSpec,
    staleness: StalenessPolicy,
    missing: MissingPolicy,
) -> Result<WindowOutcomes, MetricError> {
    let total = total_series(events, spec, staleness, missing)?;
    Ok(reduce::per_window(spec, |w| match &total {
        Some(total) => reduce::mean(total, w),
        None => Outcome::Absent,
    }))
}

/// Sum of the per-account mean end-of-day balances, per window.
///
/// Differs from [`average_daily_balance_from_events`] when accounts have
/// known values on different days: each account is averaged over its own
/// known days before the sum, so a sparsely reporting account is not
/// penalized for days only its siblings reported on.
pub fn average_end_of_day_balance_from_events(
    events: &[BalanceEvent],
    spec: &WindowSpec,
    staleness: StalenessPolicy,
) -> Result<WindowOutcomes, MetricError> {
    let series = per_account_series(events, spec, staleness)?;
    Ok(reduce::per_window(spec, |w| {
        let mut sum = 0.0;
        let mut seen = false;
        for account in &series {
            if let Outcome::Value(mean) = reduce::mean(account, w) {
                sum += mean;
                seen = true;
            }
        }
        if seen {
            Outcome::Value(sum)
        } else {
            Outcome::Absent
        }
    }))
}

/// Median of the summed end-of-day balance, restricted to active days.
///
/// A day is active when at least one raw balance or transaction event was
/// observed on it. Carried quiet days are excluded so long inactive
/// stretches cannot pad the median.
pub fn median_end_of_day_balance_from_events(
    balances: &[BalanceEvent],
    transactions: &[TransactionEvent],
    spec: &WindowSpec,
    staleness: StalenessPolicy,
    missing: MissingPolicy,
) -> Result<WindowOutcomes, MetricError> {
    let total = total_series(balances, spec, staleness, missing)?;
    let mut active: BTreeSet<Day> = reduce::observed_days(balances);
    active.extend(reduce::observed_days(transactions));

    Ok(reduce::per_window(spec, |w| match &total {
        Some(total) => reduce::median(total, w, Some(&active)),
        None => Outcome::Absent,
    }))
}

/// Sum of each account's most recent reported balance inside the window.
///
/// No forward-fill: an account with no report inside the window does not
/// participate, and a window with no reports at all is absent.
pub fn sum_of_balances_latest_from_events(
    events: &[BalanceEvent],
    spec: &WindowSpec,
) -> WindowOutcomes {
    reduce::per_window(spec, |w| latest_per_account(events, w))
}

/// Sum of each account's lowest reported balance inside the window.
///
/// Operates on raw observations like [`sum_of_balances_latest_from_events`]:
/// no forward-fill, accounts without a report inside the window do not
/// participate, and a window with no reports at all is absent.
pub fn sum_of_minimum_balances_from_events(
    events: &[BalanceEvent],
    spec: &WindowSpec,
) -> WindowOutcomes {
    reduce::per_window(spec, |w| min_per_account(events, w))
}

/// Async wrapper over [`average_daily_balance_from_events`].
pub async fn average_daily_balance(
    collector: &Collector,
    user: &UserId,
    category: Option<AccountCategory>,
    spec: &WindowSpec,
    staleness: StalenessPolicy,
    missing: MissingPolicy,
) -> Result<WindowOutcomes, MetricError> {
    let collected = collector
        .balance_events(
            user,
            category,
            spec.overall_start().midnight(),
            spec.overall_end().midnight(),
        )
        .await?;
    average_daily_balance_from_events(&collected.events, spec, staleness, missing)
}

/// Async wrapper over [`average_end_of_day_balance_from_events`].
pub async fn average_end_of_day_balance(
    collector: &Collector,
    user: &UserId,
    category: Option<AccountCategory>,
    spec: &WindowSpec,
    staleness: StalenessPolicy,
) -> Result<WindowOutcomes, MetricError> {
    let collected = collector
        .balance_events(
            user,
            category,
            spec.overall_start().midnight(),
            spec.overall_end().midnight(),
        )
        .await?;
    average_end_of_day_balance_from_events(&collected.events, spec, staleness)
}

/// Async wrapper over [`median_end_of_day_balance_from_events`].
pub async fn median_end_of_day_balance(
    collector: &Collector,
    user: &UserId,
    category: Option<AccountCategory>,
    spec: &WindowSpec,
    staleness: StalenessPolicy,
    missing: MissingPolicy,
) -> Result<WindowOutcomes, MetricError> {
    let start = spec.overall_start().midnight();
    let end = spec.overall_end().midnight();
    let balances = collector.balance_events(user, category, start, end).await?;
    let transactions = collector
        .transaction_events(user, category, start, end)
        .await?;
    median_end_of_day_balance_from_events(
        &balances.events,
        &transactions.events,
        spec,
        staleness,
        missing,
    )
}

/// Async wrapper over [`sum_of_balances_latest_from_events`].
pub async fn sum_of_balances_latest(
    collector: &Collector,
    user: &UserId,
    category: Option<AccountCategory>,
    spec: &WindowSpec,
) -> Result<WindowOutcomes, MetricError> {
    let collected = collector
        .balance_events(
            user,
            category,
            spec.overall_start().midnight(),
            spec.overall_end().midnight(),
        )
        .await?;
    Ok(sum_of_balances_latest_from_events(&collected.events, spec))
}

/// Async wrapper over [`sum_of_minimum_balances_from_events`].
pub async fn sum_of_minimum_balances(
    collector: &Collector,
    user: &UserId,
    category: Option<AccountCategory>,
    spec: &WindowSpec,
) -> Result<WindowOutcomes, MetricError> {
    let collected = collector
        .balance_events(
            user,
            category,
            spec.overall_start().midnight(),
            spec.overall_end().midnight(),
        )
        .await?;
    Ok(sum_of_minimum_balances_from_events(&collected.events, spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use saldo_core::domain::{AccountId, AccountKey, InstitutionId, UtcDateTime};

    fn key(institution: &str, account: &str) -> AccountKey {
        AccountKey::new(
            InstitutionId::parse(institution).expect("id"),
            AccountId::parse(account).expect("id"),
        )
    }

    fn balance(institution: &str, account: &str, ts: &str, amount: f64) -> BalanceEvent {
        BalanceEvent::new(
            key(institution, account),
            UtcDateTime::parse(ts).expect("ts"),
            amount,
            AccountCategory::Depository,
        )
        .expect("event")
    }

    fn spec() -> WindowSpec {
        WindowSpec::trailing_days(
            UtcDateTime::parse("2021-10-01T00:00:00Z").expect("ts"),
            &[30, 60, 90],
        )
        .expect("spec")
    }

    #[test]
    fn no_events_means_every_window_absent() {
        let outcomes =
            average_daily_balance_from_events(&[], &spec(), StalenessPolicy::new(10), MissingPolicy::Zero)
                .expect("metric");
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.values().all(|o| o.is_absent()));
    }

    #[test]
    fn average_daily_balance_carries_across_quiet_days() {
        // One report of 60 on Sep 21; carried 10 days so Sep 21-30 are
        // known in d0_30, every older window stays absent.
        let events = vec![balance("mpesa", "acct-1", "2021-09-21T12:00:00Z", 60.0)];
        let outcomes = average_daily_balance_from_events(
            &events,
            &spec(),
            StalenessPolicy::new(10),
            MissingPolicy::Zero,
        )
        .expect("metric");

        assert_eq!(outcomes["d0_30"], Outcome::Value(60.0));
        assert_eq!(outcomes["d31_60"], Outcome::Absent);
        assert_eq!(outcomes["d61_90"], Outcome::Absent);
    }

    #[test]
    fn average_daily_balance_sums_accounts_per_day() {
        let events = vec![
            balance("mpesa", "acct-1", "2021-09-26T12:00:00Z", 100.0),
            balance("gtbank", "acct-2", "2021-09-26T12:00:00Z", 40.0),
        ];
        let outcomes = average_daily_balance_from_events(
            &events,
            &spec(),
            StalenessPolicy::new(10),
            MissingPolicy::Zero,
        )
        .expect("metric");
        // Both accounts known Sep 26-30, constant total of 140.
        assert_eq!(outcomes["d0_30"], Outcome::Value(140.0));
    }

    #[test]
    fn end_of_day_average_sums_per_account_means() {
        // acct-1 averages 100 over its known days, acct-2 averages 50 over
        // different known days; the per-account shape sums the means.
        let events = vec![
            balance("mpesa", "acct-1", "2021-09-05T12:00:00Z", 100.0),
            balance("gtbank", "acct-2", "2021-09-25T12:00:00Z", 50.0),
        ];
        let outcomes = average_end_of_day_balance_from_events(
            &events,
            &spec(),
            StalenessPolicy::NO_CARRY,
        )
        .expect("metric");
        assert_eq!(outcomes["d0_30"], Outcome::Value(150.0));
    }

    #[test]
    fn median_ignores_carried_quiet_stretches() {
        let events = vec![
            balance("mpesa", "acct-1", "2021-09-02T12:00:00Z", 100.0),
            balance("mpesa", "acct-1", "2021-09-28T12:00:00Z", 10.0),
        ];
        let outcomes = median_end_of_day_balance_from_events(
            &events,
            &[],
            &spec(),
            StalenessPolicy::new(30),
            MissingPolicy::Zero,
        )
        .expect("metric");
        // Only the two report days are active; carried 100s in between do
        // not pad the median.
        assert_eq!(outcomes["d0_30"], Outcome::Value(55.0));
    }

    #[test]
    fn minimum_sum_needs_a_report_inside_the_window() {
        let events = vec![
            balance("mpesa", "acct-1", "2021-09-10T12:00:00Z", 30.0),
            balance("mpesa", "acct-1", "2021-09-20T12:00:00Z", 80.0),
            balance("gtbank", "acct-2", "2021-09-25T12:00:00Z", 15.0),
            balance("gtbank", "acct-2", "2021-08-15T12:00:00Z", 5.0),
        ];
        let outcomes = sum_of_minimum_balances_from_events(&events, &spec());
        // acct-1 bottoms out at 30, acct-2 at 15; acct-2's lower August
        // report belongs to d31_60 and does not leak into d0_30.
        assert_eq!(outcomes["d0_30"], Outcome::Value(45.0));
        assert_eq!(outcomes["d31_60"], Outcome::Value(5.0));
        assert_eq!(outcomes["d61_90"], Outcome::Absent);
    }

    #[test]
    fn latest_sum_needs_a_report_inside_the_window() {
        let events = vec![
            balance("mpesa", "acct-1", "2021-09-10T12:00:00Z", 30.0),
            balance("mpesa", "acct-1", "2021-09-20T12:00:00Z", 80.0),
            balance("gtbank", "acct-2", "2021-08-15T12:00:00Z", 500.0),
        ];
        let outcomes = sum_of_balances_latest_from_events(&events, &spec());
        // acct-2 last reported in d31_60; it does not leak into d0_30.
        assert_eq!(outcomes["d0_30"], Outcome::Value(80.0));
        assert_eq!(outcomes["d31_60"], Outcome::Value(500.0));
        assert_eq!(outcomes["d61_90"], Outcome::Absent);
    }
}
