//! Debt-to-income ratios.
//!
//! Both variants divide observed debt by credit inflow through the shared
//! ratio reduction, so the degenerate cases line up: zero debt is `0`
//! whatever the income, and positive debt over zero or absent income is
//! `+inf`.

use saldo_core::aggregate::latest_per_account;
use saldo_core::collector::Collector;
use saldo_core::domain::{
    AccountCategory, BalanceEvent, CreditReport, Outcome, TransactionEvent, UserId, WindowSpec,
};
use saldo_core::reduce::{self, WindowOutcomes};

use crate::cashflow::sum_of_credits_from_events;
use crate::error::MetricError;

/// Outstanding debt reported on the credit report.
///
/// Tradelines without a reported amount count as `0`. A report is always a
/// positive observation, so even an empty one yields `Value(0)`, never
/// absent.
fn tradeline_debt(report: &CreditReport) -> Outcome {
    Outcome::Value(
        report
            .outstanding()
            .filter_map(|t| t.amount)
            .sum::<f64>(),
    )
}

/// Tradeline debt divided by credit inflow, per window.
pub fn debt_to_income_ratio_from_events(
    report: &CreditReport,
    transactions: &[TransactionEvent],
    spec: &WindowSpec,
) -> WindowOutcomes {
    let debt = tradeline_debt(report);
    let income = sum_of_credits_from_events(transactions, spec);
    reduce::per_window(spec, |w| ratio_for(debt, &income, w.name()))
}

/// Latest loan balances divided by credit inflow, per window.
///
/// Debt here is the sum of each loan account's most recent balance report
/// inside the window, so it moves with the window while tradeline debt
/// does not.
pub fn debt_to_income_ratio_latest_from_events(
    loan_balances: &[BalanceEvent],
    transactions: &[TransactionEvent],
    spec: &WindowSpec,
) -> WindowOutcomes {
    let income = sum_of_credits_from_events(transactions, spec);
    reduce::per_window(spec, |w| {
        let debt = latest_per_account(loan_balances, w);
        ratio_for(debt, &income, w.name())
    })
}

fn ratio_for(debt: Outcome, income: &WindowOutcomes, window: &str) -> Outcome {
    let income = income.get(window).copied().unwrap_or(Outcome::Absent);
    reduce::ratio(debt, income)
}

/// Async wrapper over [`debt_to_income_ratio_from_events`].
pub async fn debt_to_income_ratio(
    collector: &Collector,
    user: &UserId,
    spec: &WindowSpec,
) -> Result<WindowOutcomes, MetricError> {
    let report = collector.credit_report(user).await?;
    let transactions = collector
        .transaction_events(
            user,
            None,
            spec.overall_start().midnight(),
            spec.overall_end().midnight(),
        )
        .await?;
    Ok(debt_to_income_ratio_from_events(
        &report,
        &transactions.events,
        spec,
    ))
}

/// Async wrapper over [`debt_to_income_ratio_latest_from_events`].
pub async fn debt_to_income_ratio_latest(
    collector: &Collector,
    user: &UserId,
    spec: &WindowSpec,
) -> Result<WindowOutcomes, MetricError> {
    let start = spec.overall_start().midnight();
    let end = spec.overall_end().midnight();
    let loans = collector
        .balance_events(user, Some(AccountCategory::Loan), start, end)
        .await?;
    let transactions = collector.transaction_events(user, None, start, end).await?;
    Ok(debt_to_income_ratio_latest_from_events(
        &loans.events,
        &transactions.events,
        spec,
    ))
}
