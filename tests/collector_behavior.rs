//! Behavior tests for concurrent collection across institutions.

use std::time::Duration;

use saldo_core::collector::{CollectError, Collector, CollectorConfig, PartialDataPolicy};
use saldo_core::domain::{AccountCategory, TransactionImpact};
use saldo_tests::{balance, institution_id, transaction, ts, user, Arc, FakeSource};

fn collector(source: FakeSource, policy: PartialDataPolicy) -> Collector {
    Collector::new(Arc::new(source), CollectorConfig::new(policy))
}

// =============================================================================
// Fan-out and merge
// =============================================================================

#[tokio::test]
async fn when_every_institution_responds_all_events_are_merged() {
    // Given: two healthy institutions with one balance each.
    let source = FakeSource::new()
        .with_institution("mpesa", &[AccountCategory::Depository])
        .with_institution("gtbank", &[AccountCategory::Depository])
        .with_balances(vec![
            balance("mpesa", "acct-1", "2021-09-10T08:00:00Z", 50.0),
            balance("gtbank", "acct-2", "2021-09-12T08:00:00Z", 80.0),
        ]);
    let collector = collector(source, PartialDataPolicy::Fail);

    // When: balances are collected for September.
    let collected = collector
        .balance_events(
            &user(),
            None,
            ts("2021-09-01T00:00:00Z"),
            ts("2021-10-01T00:00:00Z"),
        )
        .await
        .expect("collection succeeds");

    // Then: both institutions contribute and nothing was skipped.
    assert_eq!(collected.events.len(), 2);
    assert!(!collected.is_partial());
}

#[tokio::test]
async fn when_institutions_are_filtered_by_category_only_matches_are_queried() {
    // Given: a loan-only institution next to a depository one.
    let source = FakeSource::new()
        .with_institution("mpesa", &[AccountCategory::Depository])
        .with_institution("quickloan", &[AccountCategory::Loan]);
    let collector = collector(source, PartialDataPolicy::Fail);

    let institutions = collector
        .institutions(&user(), Some(AccountCategory::Loan))
        .await
        .expect("discovery succeeds");

    assert_eq!(institutions.len(), 1);
    assert_eq!(institutions[0].id, institution_id("quickloan"));
}

#[tokio::test]
async fn when_balances_are_requested_the_start_is_widened_by_the_lookback() {
    // Given: a collector with a 10-day lookback.
    let source = Arc::new(
        FakeSource::new().with_institution("mpesa", &[AccountCategory::Depository]),
    );
    let collector = Collector::new(
        source.clone(),
        CollectorConfig::new(PartialDataPolicy::Fail).with_lookback_days(10),
    );

    // When: September balances are requested.
    collector
        .balance_events(
            &user(),
            None,
            ts("2021-09-01T00:00:00Z"),
            ts("2021-10-01T00:00:00Z"),
        )
        .await
        .expect("collection succeeds");

    // Then: the upstream request starts 10 days earlier so forward-fill
    // can seed the first days of the caller's range.
    let requests = source.balance_requests.lock().expect("request log lock");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].start, ts("2021-08-22T00:00:00Z"));
    assert_eq!(requests[0].end, ts("2021-10-01T00:00:00Z"));
}

// =============================================================================
// Partial-data policy
// =============================================================================

#[tokio::test]
async fn when_policy_is_fail_one_bad_institution_sinks_the_collection() {
    let source = FakeSource::new()
        .with_institution("mpesa", &[AccountCategory::Depository])
        .with_institution("gtbank", &[AccountCategory::Depository])
        .with_failing_institution("gtbank")
        .with_balances(vec![balance("mpesa", "acct-1", "2021-09-10T08:00:00Z", 50.0)]);
    let collector = collector(source, PartialDataPolicy::Fail);

    let error = collector
        .balance_events(
            &user(),
            None,
            ts("2021-09-01T00:00:00Z"),
            ts("2021-10-01T00:00:00Z"),
        )
        .await
        .expect_err("collection must fail");

    match error {
        CollectError::Fetch { institution, .. } => {
            assert_eq!(institution, institution_id("gtbank"));
        }
        other => panic!("expected a fetch error, got {other}"),
    }
}

#[tokio::test]
async fn when_policy_is_proceed_the_bad_institution_is_skipped_and_recorded() {
    saldo_tests::init_logging();
    let source = FakeSource::new()
        .with_institution("mpesa", &[AccountCategory::Depository])
        .with_institution("gtbank", &[AccountCategory::Depository])
        .with_failing_institution("gtbank")
        .with_transactions(vec![transaction(
            "mpesa",
            "acct-1",
            "2021-09-10T08:00:00Z",
            25.0,
            TransactionImpact::Credit,
        )]);
    let collector = collector(source, PartialDataPolicy::Proceed);

    let collected = collector
        .transaction_events(
            &user(),
            None,
            ts("2021-09-01T00:00:00Z"),
            ts("2021-10-01T00:00:00Z"),
        )
        .await
        .expect("collection proceeds");

    assert_eq!(collected.events.len(), 1);
    assert!(collected.is_partial());
    assert_eq!(collected.skipped, vec![institution_id("gtbank")]);
}

// =============================================================================
// Timeouts
// =============================================================================

#[tokio::test]
async fn when_an_institution_hangs_the_fetch_times_out() {
    let source = FakeSource::new()
        .with_institution("mpesa", &[AccountCategory::Depository])
        .with_slow_institution("mpesa", Duration::from_secs(60));
    let collector = Collector::new(
        Arc::new(source),
        CollectorConfig::new(PartialDataPolicy::Fail)
            .with_fetch_timeout(Duration::from_millis(50)),
    );

    let error = collector
        .balance_events(
            &user(),
            None,
            ts("2021-09-01T00:00:00Z"),
            ts("2021-10-01T00:00:00Z"),
        )
        .await
        .expect_err("collection must time out");

    assert!(matches!(error, CollectError::Timeout { .. }));
}

#[tokio::test]
async fn when_a_slow_institution_is_skippable_the_rest_still_arrive() {
    let source = FakeSource::new()
        .with_institution("mpesa", &[AccountCategory::Depository])
        .with_institution("gtbank", &[AccountCategory::Depository])
        .with_slow_institution("gtbank", Duration::from_secs(60))
        .with_balances(vec![balance("mpesa", "acct-1", "2021-09-10T08:00:00Z", 50.0)]);
    let collector = Collector::new(
        Arc::new(source),
        CollectorConfig::new(PartialDataPolicy::Proceed)
            .with_fetch_timeout(Duration::from_millis(50)),
    );

    let collected = collector
        .balance_events(
            &user(),
            None,
            ts("2021-09-01T00:00:00Z"),
            ts("2021-10-01T00:00:00Z"),
        )
        .await
        .expect("collection proceeds");

    assert_eq!(collected.events.len(), 1);
    assert_eq!(collected.skipped, vec![institution_id("gtbank")]);
}
