//! Data recency: how stale is the newest thing we know about a user.

use saldo_core::collector::Collector;
use saldo_core::domain::{Outcome, Timestamped, UserId, UtcDateTime, WindowSpec};

use crate::error::MetricError;

/// Age in whole days of the most recent event, relative to `anchor`.
///
/// Absent when there are no events. Events after the anchor clamp to `0`
/// rather than going negative.
pub fn data_recency_from_events<E: Timestamped>(events: &[E], anchor: UtcDateTime) -> Outcome {
    let newest = events.iter().map(Timestamped::ts).max();
    match newest {
        Some(ts) => {
            let age = anchor.day().days_since(ts.day());
            Outcome::Value(age.max(0) as f64)
        }
        None => Outcome::Absent,
    }
}

/// Age in whole days of the user's most recent balance, transaction or
/// alert event across all institutions.
pub async fn data_recency(
    collector: &Collector,
    user: &UserId,
    anchor: UtcDateTime,
    lookback_days: u32,
) -> Result<Outcome, MetricError> {
    let spec = WindowSpec::last_days(anchor, lookback_days)?;
    let start = spec.overall_start().midnight();
    let end = spec.overall_end().midnight();

    let balances = collector.balance_events(user, None, start, end).await?;
    let transactions = collector.transaction_events(user, None, start, end).await?;
    let alerts = collector.alert_events(user, &[], start, end).await?;

    let newest = [
        data_recency_from_events(&balances.events, anchor),
        data_recency_from_events(&transactions.events, anchor),
        data_recency_from_events(&alerts.events, anchor),
    ]
    .into_iter()
    .filter_map(Outcome::as_f64)
    .reduce(f64::min);

    Ok(Outcome::from(newest))
}
