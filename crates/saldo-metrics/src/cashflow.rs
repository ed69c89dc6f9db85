//! Cash-flow metrics over raw transaction events. No reconstruction here;
//! transactions are summed and counted as they occurred.

use std::collections::BTreeMap;

use saldo_core::collector::Collector;
use saldo_core::domain::{
    AccountCategory, Outcome, TransactionEvent, TransactionImpact, UserId, WindowSpec,
};
use saldo_core::reduce::{self, WindowOutcomes};

use crate::error::MetricError;

fn impact_amount(impact: TransactionImpact) -> impl Fn(&TransactionEvent) -> Option<f64> {
    move |t| (t.impact == impact).then_some(t.amount)
}

/// Sum of credit (inflow) amounts per window.
pub fn sum_of_credits_from_events(
    events: &[TransactionEvent],
    spec: &WindowSpec,
) -> WindowOutcomes {
    reduce::per_window(spec, |w| {
        reduce::sum_events(events, w, impact_amount(TransactionImpact::Credit))
    })
}

/// Sum of debit (outflow) amounts per window.
pub fn sum_of_debits_from_events(
    events: &[TransactionEvent],
    spec: &WindowSpec,
) -> WindowOutcomes {
    reduce::per_window(spec, |w| {
        reduce::sum_events(events, w, impact_amount(TransactionImpact::Debit))
    })
}

/// Credits minus debits per window.
///
/// Absent only when the window holds no transactions at all; a window with
/// transactions of one impact treats the other side as `0`.
pub fn net_cash_flow_from_events(
    events: &[TransactionEvent],
    spec: &WindowSpec,
) -> WindowOutcomes {
    reduce::per_window(spec, |w| {
        let credits = reduce::sum_events(events, w, impact_amount(TransactionImpact::Credit));
        let debits = reduce::sum_events(events, w, impact_amount(TransactionImpact::Debit));
        match (credits, debits) {
            (Outcome::Absent, Outcome::Absent) => Outcome::Absent,
            (credits, debits) => Outcome::Value(
                credits.as_f64().unwrap_or(0.0) - debits.as_f64().unwrap_or(0.0),
            ),
        }
    })
}

/// Transaction count per window, optionally restricted to one impact.
/// Counts are always defined; an empty window counts `0`.
pub fn count_transactions_from_events(
    events: &[TransactionEvent],
    spec: &WindowSpec,
    impact: Option<TransactionImpact>,
) -> BTreeMap<String, u64> {
    spec.windows()
        .iter()
        .map(|w| {
            let count = reduce::count_events(events, w, |t| {
                impact.is_none_or(|impact| t.impact == impact)
            });
            (w.name().to_owned(), count)
        })
        .collect()
}

async fn collect_transactions(
    collector: &Collector,
    user: &UserId,
    category: Option<AccountCategory>,
    spec: &WindowSpec,
) -> Result<Vec<TransactionEvent>, MetricError> {
    let collected = collector
        .transaction_events(
            user,
            category,
            spec.overall_start().midnight(),
            spec.overall_end().midnight(),
        )
        .await?;
    Ok(collected.events)
}

/// Async wrapper over [`sum_of_credits_from_events`].
pub async fn sum_of_credits(
    collector: &Collector,
    user: &UserId,
    category: Option<AccountCategory>,
    spec: &WindowSpec,
) -> Result<WindowOutcomes, MetricError> {
    let events = collect_transactions(collector, user, category, spec).await?;
    Ok(sum_of_credits_from_events(&events, spec))
}

/// Async wrapper over [`sum_of_debits_from_events`].
pub async fn sum_of_debits(
    collector: &Collector,
    user: &UserId,
    category: Option<AccountCategory>,
    spec: &WindowSpec,
) -> Result<WindowOutcomes, MetricError> {
    let events = collect_transactions(collector, user, category, spec).await?;
    Ok(sum_of_debits_from_events(&events, spec))
}

/// Async wrapper over [`net_cash_flow_from_events`].
pub async fn net_cash_flow(
    collector: &Collector,
    user: &UserId,
    category: Option<AccountCategory>,
    spec: &WindowSpec,
) -> Result<WindowOutcomes, MetricError> {
    let events = collect_transactions(collector, user, category, spec).await?;
    Ok(net_cash_flow_from_events(&events, spec))
}

/// Async wrapper over [`count_transactions_from_events`].
pub async fn count_transactions(
    collector: &Collector,
    user: &UserId,
    category: Option<AccountCategory>,
    spec: &WindowSpec,
    impact: Option<TransactionImpact>,
) -> Result<BTreeMap<String, u64>, MetricError> {
    let events = collect_transactions(collector, user, category, spec).await?;
    Ok(count_transactions_from_events(&events, spec, impact))
}
