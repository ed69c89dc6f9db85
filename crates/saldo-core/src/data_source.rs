//! Data source trait and request types.
//!
//! The engine never talks to the network itself; it consumes this contract.
//! A production implementation lives in [`crate::adapters::rest`]; tests
//! supply in-memory fakes.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::domain::{
    AccountCategory, AlertEvent, BalanceEvent, CreditReport, Institution, InstitutionId,
    TransactionEvent, UserId, UtcDateTime,
};

/// Boxed future returned by every data-source endpoint.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Source-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    Decode,
    Internal,
}

/// Structured data-source error carried up to the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Decode,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Decode => "source.decode",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for institution discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstitutionsRequest {
    pub user: UserId,
}

impl InstitutionsRequest {
    pub const fn new(user: UserId) -> Self {
        Self { user }
    }
}

/// Request payload for balance retrieval at one institution.
#[derive(Debug, Clone, PartialEq)]
pub struct BalancesRequest {
    pub user: UserId,
    pub institution: InstitutionId,
    pub start: UtcDateTime,
    pub end: UtcDateTime,
    /// Empty means all account categories.
    pub categories: Vec<AccountCategory>,
}

impl BalancesRequest {
    pub fn new(
        user: UserId,
        institution: InstitutionId,
        start: UtcDateTime,
        end: UtcDateTime,
        categories: Vec<AccountCategory>,
    ) -> Result<Self, SourceError> {
        if start >= end {
            return Err(SourceError::invalid_request(
                "balances request start must precede end",
            ));
        }
        Ok(Self {
            user,
            institution,
            start,
            end,
            categories,
        })
    }
}

/// Request payload for transaction retrieval at one institution.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionsRequest {
    pub user: UserId,
    pub institution: InstitutionId,
    pub start: UtcDateTime,
    pub end: UtcDateTime,
    /// Empty means all account categories.
    pub categories: Vec<AccountCategory>,
}

impl TransactionsRequest {
    pub fn new(
        user: UserId,
        institution: InstitutionId,
        start: UtcDateTime,
        end: UtcDateTime,
        categories: Vec<AccountCategory>,
    ) -> Result<Self, SourceError> {
        if start >= end {
            return Err(SourceError::invalid_request(
                "transactions request start must precede end",
            ));
        }
        Ok(Self {
            user,
            institution,
            start,
            end,
            categories,
        })
    }
}

/// Request payload for label-filtered alert retrieval at one institution.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertsRequest {
    pub user: UserId,
    pub institution: InstitutionId,
    pub start: UtcDateTime,
    pub end: UtcDateTime,
    /// Empty means all labels.
    pub labels: Vec<String>,
}

impl AlertsRequest {
    pub fn new(
        user: UserId,
        institution: InstitutionId,
        start: UtcDateTime,
        end: UtcDateTime,
        labels: Vec<String>,
    ) -> Result<Self, SourceError> {
        if start >= end {
            return Err(SourceError::invalid_request(
                "alerts request start must precede end",
            ));
        }
        Ok(Self {
            user,
            institution,
            start,
            end,
            labels,
        })
    }
}

/// Request payload for the credit-report endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditReportRequest {
    pub user: UserId,
}

impl CreditReportRequest {
    pub const fn new(user: UserId) -> Self {
        Self { user }
    }
}

/// Financial-data source contract.
///
/// Implementations must be `Send + Sync`; the collector shares one handle
/// across concurrent per-institution fetches. The server is trusted to
/// filter by time range and (for balances/transactions) account category;
/// implementations must still tag every event with the institution of the
/// request so downstream grouping by [`crate::domain::AccountKey`] holds.
pub trait DataSource: Send + Sync {
    /// All institutions the user holds accounts with.
    fn institutions(&self, req: InstitutionsRequest) -> SourceFuture<'_, Vec<Institution>>;

    /// Balance notifications for one institution inside `[start, end)`.
    fn balances(&self, req: BalancesRequest) -> SourceFuture<'_, Vec<BalanceEvent>>;

    /// Transactions for one institution inside `[start, end)`.
    fn transactions(&self, req: TransactionsRequest) -> SourceFuture<'_, Vec<TransactionEvent>>;

    /// Labelled alerts for one institution inside `[start, end)`.
    fn alerts(&self, req: AlertsRequest) -> SourceFuture<'_, Vec<AlertEvent>>;

    /// The user's credit report.
    fn credit_report(&self, req: CreditReportRequest) -> SourceFuture<'_, CreditReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reversed_time_range() {
        let user = UserId::parse("958a5ae8-f3a3-41d5-ae48-177fdc19e3f4").expect("user");
        let institution = InstitutionId::parse("bank-a").expect("id");
        let start = UtcDateTime::parse("2021-10-01T00:00:00Z").expect("ts");
        let end = UtcDateTime::parse("2021-09-01T00:00:00Z").expect("ts");

        let err = BalancesRequest::new(user, institution, start, end, Vec::new())
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::InvalidRequest);
        assert!(!err.retryable());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(SourceError::unavailable("x").code(), "source.unavailable");
        assert_eq!(SourceError::rate_limited("x").code(), "source.rate_limited");
        assert_eq!(SourceError::decode("x").code(), "source.decode");
        assert!(SourceError::rate_limited("x").retryable());
        assert!(!SourceError::decode("x").retryable());
    }
}
