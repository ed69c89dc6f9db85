//! Per-window statistics over daily series and flat event lists.
//!
//! Every reducer is a pure function of one window; windows are independent
//! and evaluation order never affects results. Degenerate inputs become
//! [`Outcome`] values (absent, zero, infinity), never errors, so callers
//! must handle them explicitly.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{Day, Outcome, Timestamped, Window, WindowSpec};
use crate::series::DailySeries;

/// Result shape shared by every metric: one outcome per named window.
pub type WindowOutcomes = BTreeMap<String, Outcome>;

/// Evaluate `reducer` once per window of the spec.
pub fn per_window(
    spec: &WindowSpec,
    mut reducer: impl FnMut(&Window) -> Outcome,
) -> WindowOutcomes {
    spec.windows()
        .iter()
        .map(|w| (w.name().to_owned(), reducer(w)))
        .collect()
}

/// Arithmetic mean of the known daily values inside the window.
///
/// Zero known days yields `Absent`, never a coerced `0`.
pub fn mean(series: &DailySeries, window: &Window) -> Outcome {
    let mut sum = 0.0;
    let mut count = 0u64;
    for (_, value) in series.known().filter(|(day, _)| window.contains_day(*day)) {
        sum += value;
        count += 1;
    }

    if count == 0 {
        return Outcome::Absent;
    }
    Outcome::Value(sum / count as f64)
}

/// Median of the known daily values inside the window.
///
/// When `active_days` is given, only days present in the set participate.
/// Metrics use this to restrict a median-of-total-balance to days with raw
/// activity, so forward-carried quiet days cannot pad the median.
pub fn median(
    series: &DailySeries,
    window: &Window,
    active_days: Option<&BTreeSet<Day>>,
) -> Outcome {
    let mut values: Vec<f64> = series
        .known()
        .filter(|(day, _)| window.contains_day(*day))
        .filter(|(day, _)| active_days.is_none_or(|active| active.contains(day)))
        .map(|(_, value)| value)
        .collect();

    if values.is_empty() {
        return Outcome::Absent;
    }

    values.sort_by(|a, b| a.partial_cmp(b).expect("series values are finite"));
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    };
    Outcome::Value(median)
}

/// Days on which at least one raw event was observed.
pub fn observed_days<E: Timestamped>(events: &[E]) -> BTreeSet<Day> {
    events.iter().map(|e| e.ts().day()).collect()
}

/// Sum event amounts inside the window.
///
/// `value` returns `Some(amount)` for events matching the metric's
/// predicate and `None` otherwise. A window holding no events at all is
/// `Absent`; a window holding events of which none match sums to `0`. The
/// two cases stay distinct.
pub fn sum_events<E: Timestamped>(
    events: &[E],
    window: &Window,
    value: impl Fn(&E) -> Option<f64>,
) -> Outcome {
    let mut sum = 0.0;
    let mut seen = false;
    for event in events.iter().filter(|e| window.contains(e.ts())) {
        seen = true;
        if let Some(amount) = value(event) {
            sum += amount;
        }
    }

    if !seen {
        return Outcome::Absent;
    }
    Outcome::Value(sum)
}

/// Count events inside the window matching the predicate. Always defined.
pub fn count_events<E: Timestamped>(
    events: &[E],
    window: &Window,
    predicate: impl Fn(&E) -> bool,
) -> u64 {
    events
        .iter()
        .filter(|e| window.contains(e.ts()) && predicate(e))
        .count() as u64
}

/// The most recent matching value inside the window.
pub fn last_value<E: Timestamped>(
    events: &[E],
    window: &Window,
    value: impl Fn(&E) -> Option<f64>,
) -> Outcome {
    let mut latest: Option<(crate::domain::UtcDateTime, f64)> = None;
    for event in events.iter().filter(|e| window.contains(e.ts())) {
        if let Some(amount) = value(event) {
            match latest {
                Some((ts, _)) if ts > event.ts() => {}
                _ => latest = Some((event.ts(), amount)),
            }
        }
    }
    Outcome::from(latest.map(|(_, amount)| amount))
}

/// Debt-to-income style ratio with explicit degenerate-case policy:
///
/// - absent numerator dominates: the result is absent whatever the
///   denominator holds;
/// - a present zero numerator yields `0`, even over a zero denominator;
/// - a present nonzero numerator over a zero or absent denominator yields
///   `+inf`: observed debt with no observed income is a meaningful extreme
///   signal, not a division error.
pub fn ratio(numerator: Outcome, denominator: Outcome) -> Outcome {
    match (numerator, denominator) {
        (Outcome::Absent, _) => Outcome::Absent,
        (Outcome::Value(n), _) if n == 0.0 => Outcome::ZERO,
        (Outcome::Value(_), Outcome::Absent) => Outcome::Value(f64::INFINITY),
        (Outcome::Value(_), Outcome::Value(d)) if d == 0.0 => Outcome::Value(f64::INFINITY),
        (Outcome::Value(n), Outcome::Value(d)) => Outcome::Value(n / d),
    }
}
