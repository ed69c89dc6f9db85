//! Alert-count metrics. One generic label-filtered counter covers the
//! overdraft, sim-swap and loan-default families.

use std::collections::BTreeMap;

use saldo_core::collector::Collector;
use saldo_core::domain::{AlertEvent, UserId, WindowSpec};
use saldo_core::reduce;

use crate::error::MetricError;

/// Alerts carrying `label`, counted per window. Always defined.
pub fn count_alerts_with_label_from_events(
    events: &[AlertEvent],
    spec: &WindowSpec,
    label: &str,
) -> BTreeMap<String, u64> {
    spec.windows()
        .iter()
        .map(|w| {
            let count = reduce::count_events(events, w, |a| a.has_label(label));
            (w.name().to_owned(), count)
        })
        .collect()
}

/// Async wrapper over [`count_alerts_with_label_from_events`].
pub async fn count_alerts_with_label(
    collector: &Collector,
    user: &UserId,
    spec: &WindowSpec,
    label: &str,
) -> Result<BTreeMap<String, u64>, MetricError> {
    let collected = collector
        .alert_events(
            user,
            &[label.to_owned()],
            spec.overall_start().midnight(),
            spec.overall_end().midnight(),
        )
        .await?;
    Ok(count_alerts_with_label_from_events(
        &collected.events,
        spec,
        label,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use saldo_core::domain::{InstitutionId, UtcDateTime};

    fn alert(ts: &str, labels: &[&str]) -> AlertEvent {
        AlertEvent::new(
            InstitutionId::parse("mpesa").expect("id"),
            UtcDateTime::parse(ts).expect("ts"),
            labels.iter().map(|l| (*l).to_owned()).collect(),
        )
    }

    #[test]
    fn counts_only_matching_labels_per_window() {
        let spec = WindowSpec::trailing_days(
            UtcDateTime::parse("2021-10-01T00:00:00Z").expect("ts"),
            &[30, 60, 90],
        )
        .expect("spec");
        let events = vec![
            alert("2021-09-10T08:00:00Z", &["overdraft"]),
            alert("2021-09-11T08:00:00Z", &["sim_swap", "overdraft"]),
            alert("2021-08-20T08:00:00Z", &["overdraft"]),
            alert("2021-09-12T08:00:00Z", &["loan_defaulted"]),
        ];

        let counts = count_alerts_with_label_from_events(&events, &spec, "overdraft");
        assert_eq!(counts["d0_30"], 2);
        assert_eq!(counts["d31_60"], 1);
        assert_eq!(counts["d61_90"], 0);
    }
}
