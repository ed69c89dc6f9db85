use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{AccountKey, InstitutionId, UtcDateTime};
use crate::ValidationError;

/// Coarse account classification used to filter metrics by account kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    Depository,
    Loan,
    Other,
}

impl AccountCategory {
    /// Map a provider-reported account type onto a category. Unrecognized
    /// types (wallets, revolving products, ...) collapse into `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "depository" | "mobilemoney" | "mobile-money" => Self::Depository,
            "loan" | "revolving_loan" => Self::Loan,
            _ => Self::Other,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Depository => "depository",
            Self::Loan => "loan",
            Self::Other => "other",
        }
    }
}

impl Display for AccountCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a transaction relative to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionImpact {
    Credit,
    Debit,
}

impl FromStr for TransactionImpact {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CREDIT" => Ok(Self::Credit),
            "DEBIT" => Ok(Self::Debit),
            other => Err(ValidationError::InvalidImpact {
                value: other.to_owned(),
            }),
        }
    }
}

/// Anything carrying an event timestamp. The window reducer operates on this
/// seam so every event kind reduces the same way.
pub trait Timestamped {
    fn ts(&self) -> UtcDateTime;
}

/// One balance notification for one account.
///
/// Arrival order is not guaranteed; consumers must sort by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceEvent {
    pub account: AccountKey,
    pub ts: UtcDateTime,
    pub balance: f64,
    pub category: AccountCategory,
}

impl BalanceEvent {
    pub fn new(
        account: AccountKey,
        ts: UtcDateTime,
        balance: f64,
        category: AccountCategory,
    ) -> Result<Self, ValidationError> {
        if !balance.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "balance" });
        }
        Ok(Self {
            account,
            ts,
            balance,
            category,
        })
    }
}

impl Timestamped for BalanceEvent {
    fn ts(&self) -> UtcDateTime {
        self.ts
    }
}

/// One transaction for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub account: AccountKey,
    pub ts: UtcDateTime,
    pub amount: f64,
    pub impact: TransactionImpact,
    pub category: AccountCategory,
}

impl TransactionEvent {
    pub fn new(
        account: AccountKey,
        ts: UtcDateTime,
        amount: f64,
        impact: TransactionImpact,
        category: AccountCategory,
    ) -> Result<Self, ValidationError> {
        if !amount.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "amount" });
        }
        if amount < 0.0 {
            return Err(ValidationError::NegativeValue { field: "amount" });
        }
        Ok(Self {
            account,
            ts,
            amount,
            impact,
            category,
        })
    }
}

impl Timestamped for TransactionEvent {
    fn ts(&self) -> UtcDateTime {
        self.ts
    }
}

/// One labelled alert notification (overdraft, sim swap, loan default, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub institution: InstitutionId,
    pub ts: UtcDateTime,
    pub labels: Vec<String>,
}

impl AlertEvent {
    pub const fn new(institution: InstitutionId, ts: UtcDateTime, labels: Vec<String>) -> Self {
        Self {
            institution,
            ts,
            labels,
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

impl Timestamped for AlertEvent {
    fn ts(&self) -> UtcDateTime {
        self.ts
    }
}

/// An institution the user holds accounts with, and the account kinds the
/// provider has observed there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: InstitutionId,
    pub account_types: BTreeSet<AccountCategory>,
}

impl Institution {
    pub fn new(id: InstitutionId, account_types: BTreeSet<AccountCategory>) -> Self {
        Self { id, account_types }
    }

    pub fn has_category(&self, category: AccountCategory) -> bool {
        self.account_types.contains(&category)
    }
}

/// Repayment state of a credit-report tradeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradelineStatus {
    Open,
    LatePayment,
    Default,
    Closed,
}

impl TradelineStatus {
    /// Statuses counted toward outstanding debt.
    pub const fn is_outstanding(self) -> bool {
        matches!(self, Self::Open | Self::LatePayment | Self::Default)
    }
}

impl FromStr for TradelineStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "late_payment" | "late_payments" => Ok(Self::LatePayment),
            "default" => Ok(Self::Default),
            "closed" => Ok(Self::Closed),
            other => Err(ValidationError::InvalidTradelineStatus {
                value: other.to_owned(),
            }),
        }
    }
}

/// One reported tradeline on a user's credit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tradeline {
    pub status: TradelineStatus,
    /// Reported outstanding amount. Bureaus omit it for some records.
    pub amount: Option<f64>,
    pub reported: UtcDateTime,
}

impl Tradeline {
    pub fn new(
        status: TradelineStatus,
        amount: Option<f64>,
        reported: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        if let Some(amount) = amount {
            if !amount.is_finite() {
                return Err(ValidationError::NonFiniteValue { field: "amount" });
            }
            if amount < 0.0 {
                return Err(ValidationError::NegativeValue { field: "amount" });
            }
        }
        Ok(Self {
            status,
            amount,
            reported,
        })
    }
}

impl Timestamped for Tradeline {
    fn ts(&self) -> UtcDateTime {
        self.reported
    }
}

/// A user's credit report as returned by the bureau endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditReport {
    pub tradelines: Vec<Tradeline>,
}

impl CreditReport {
    pub const fn new(tradelines: Vec<Tradeline>) -> Self {
        Self { tradelines }
    }

    /// Tradelines counted toward outstanding debt (open, late, defaulted).
    pub fn outstanding(&self) -> impl Iterator<Item = &Tradeline> {
        self.tradelines.iter().filter(|t| t.status.is_outstanding())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountId;

    fn key() -> AccountKey {
        AccountKey::new(
            InstitutionId::parse("gtbank").expect("id"),
            AccountId::parse("acct-1").expect("id"),
        )
    }

    #[test]
    fn maps_provider_account_types() {
        assert_eq!(
            AccountCategory::from_label("mobilemoney"),
            AccountCategory::Depository
        );
        assert_eq!(
            AccountCategory::from_label("revolving_loan"),
            AccountCategory::Loan
        );
        assert_eq!(
            AccountCategory::from_label("working-capital"),
            AccountCategory::Other
        );
    }

    #[test]
    fn rejects_non_finite_balance() {
        let ts = UtcDateTime::parse("2021-10-01T00:00:00Z").expect("ts");
        let err = BalanceEvent::new(key(), ts, f64::NAN, AccountCategory::Depository)
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { .. }));
    }

    #[test]
    fn rejects_negative_transaction_amount() {
        let ts = UtcDateTime::parse("2021-10-01T00:00:00Z").expect("ts");
        let err = TransactionEvent::new(
            key(),
            ts,
            -5.0,
            TransactionImpact::Credit,
            AccountCategory::Depository,
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::NegativeValue { .. }));
    }

    #[test]
    fn parses_impact_case_insensitively() {
        assert_eq!(
            "credit".parse::<TransactionImpact>().expect("must parse"),
            TransactionImpact::Credit
        );
        assert!("transfer".parse::<TransactionImpact>().is_err());
    }

    #[test]
    fn outstanding_excludes_closed_tradelines() {
        let ts = UtcDateTime::parse("2021-08-15T00:00:00Z").expect("ts");
        let report = CreditReport::new(vec![
            Tradeline::new(TradelineStatus::Open, Some(100.0), ts).expect("tradeline"),
            Tradeline::new(TradelineStatus::Closed, Some(900.0), ts).expect("tradeline"),
            Tradeline::new(TradelineStatus::Default, Some(50.0), ts).expect("tradeline"),
        ]);
        assert_eq!(report.outstanding().count(), 2);
    }
}
