//! Concurrent event collection across a user's institutions.
//!
//! Institution discovery runs first; per-institution fetches then fan out
//! concurrently and meet at a join barrier before anything becomes visible
//! downstream. Dropping the returned future aborts in-flight fetches, so a
//! cancelled collection never leaks partial state.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;

use crate::data_source::{
    AlertsRequest, BalancesRequest, CreditReportRequest, DataSource, InstitutionsRequest,
    SourceError, TransactionsRequest,
};
use crate::domain::{
    AccountCategory, AlertEvent, BalanceEvent, CreditReport, Institution, InstitutionId,
    TransactionEvent, UserId, UtcDateTime,
};
use crate::ValidationError;

/// What to do when a single institution fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialDataPolicy {
    /// Abort the whole collection on the first failure.
    Fail,
    /// Skip the failing institution, log a warning, and record it in
    /// [`Collected::skipped`].
    Proceed,
}

/// Collector tuning knobs.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub partial_data: PartialDataPolicy,
    /// Days of extra balance history requested before the caller's range so
    /// forward-fill can seed the first window days. Zero disables widening.
    pub lookback_days: u32,
    /// Per-institution fetch timeout.
    pub fetch_timeout: Duration,
}

impl CollectorConfig {
    pub const fn new(partial_data: PartialDataPolicy) -> Self {
        Self {
            partial_data,
            lookback_days: 10,
            fetch_timeout: Duration::from_secs(10),
        }
    }

    pub const fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::new(PartialDataPolicy::Fail)
    }
}

/// Events gathered across institutions, plus any institutions skipped under
/// [`PartialDataPolicy::Proceed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Collected<T> {
    pub events: Vec<T>,
    pub skipped: Vec<InstitutionId>,
}

impl<T> Collected<T> {
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Collection-stage failures. These are the only failures the engine throws;
/// statistical degeneracies downstream are values, not errors.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("institution discovery failed: {0}")]
    Discovery(#[source] SourceError),

    #[error("fetch for institution '{institution}' failed: {source}")]
    Fetch {
        institution: InstitutionId,
        #[source]
        source: SourceError,
    },

    #[error("fetch for institution '{institution}' timed out after {timeout:?}")]
    Timeout {
        institution: InstitutionId,
        timeout: Duration,
    },

    #[error("credit report fetch failed: {0}")]
    CreditReport(#[source] SourceError),

    #[error("fetch task was aborted")]
    TaskFailed,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<Vec<T>, SourceError>> + Send + 'static>>;

/// Fans out per-institution fetches against an injected [`DataSource`].
pub struct Collector {
    source: Arc<dyn DataSource>,
    config: CollectorConfig,
}

impl Collector {
    pub fn new(source: Arc<dyn DataSource>, config: CollectorConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// All institutions for the user, optionally restricted to those known
    /// to hold accounts of `category`.
    pub async fn institutions(
        &self,
        user: &UserId,
        category: Option<AccountCategory>,
    ) -> Result<Vec<Institution>, CollectError> {
        let all = self
            .source
            .institutions(InstitutionsRequest::new(*user))
            .await
            .map_err(CollectError::Discovery)?;

        Ok(match category {
            Some(category) => all
                .into_iter()
                .filter(|inst| inst.has_category(category))
                .collect(),
            None => all,
        })
    }

    /// Balance events across institutions for `[start, end)`, with the start
    /// widened by the configured lookback so forward-fill can seed the first
    /// days of the caller's range.
    pub async fn balance_events(
        &self,
        user: &UserId,
        category: Option<AccountCategory>,
        start: UtcDateTime,
        end: UtcDateTime,
    ) -> Result<Collected<BalanceEvent>, CollectError> {
        let institutions = self.institutions(user, category).await?;
        let widened_start = start.minus_days(self.config.lookback_days)?;
        let categories: Vec<AccountCategory> = category.into_iter().collect();

        let user = *user;
        self.fan_out(institutions, move |source, institution| {
            let categories = categories.clone();
            Box::pin(async move {
                let req =
                    BalancesRequest::new(user, institution, widened_start, end, categories)?;
                source.balances(req).await
            })
        })
        .await
    }

    /// Transactions across institutions for `[start, end)`.
    pub async fn transaction_events(
        &self,
        user: &UserId,
        category: Option<AccountCategory>,
        start: UtcDateTime,
        end: UtcDateTime,
    ) -> Result<Collected<TransactionEvent>, CollectError> {
        let institutions = self.institutions(user, category).await?;
        let categories: Vec<AccountCategory> = category.into_iter().collect();

        let user = *user;
        self.fan_out(institutions, move |source, institution| {
            let categories = categories.clone();
            Box::pin(async move {
                let req = TransactionsRequest::new(user, institution, start, end, categories)?;
                source.transactions(req).await
            })
        })
        .await
    }

    /// Label-filtered alerts across all institutions for `[start, end)`.
    pub async fn alert_events(
        &self,
        user: &UserId,
        labels: &[String],
        start: UtcDateTime,
        end: UtcDateTime,
    ) -> Result<Collected<AlertEvent>, CollectError> {
        let institutions = self.institutions(user, None).await?;
        let labels = labels.to_vec();

        let user = *user;
        self.fan_out(institutions, move |source, institution| {
            let labels = labels.clone();
            Box::pin(async move {
                let req = AlertsRequest::new(user, institution, start, end, labels)?;
                source.alerts(req).await
            })
        })
        .await
    }

    /// The user's credit report. A single fetch; the partial-data policy
    /// does not apply.
    pub async fn credit_report(&self, user: &UserId) -> Result<CreditReport, CollectError> {
        self.source
            .credit_report(CreditReportRequest::new(*user))
            .await
            .map_err(CollectError::CreditReport)
    }

    async fn fan_out<T>(
        &self,
        institutions: Vec<Institution>,
        fetch: impl Fn(Arc<dyn DataSource>, InstitutionId) -> FetchFuture<T>,
    ) -> Result<Collected<T>, CollectError>
    where
        T: Send + 'static,
    {
        let timeout = self.config.fetch_timeout;
        let mut tasks = JoinSet::new();
        for institution in institutions {
            let id = institution.id;
            let future = fetch(Arc::clone(&self.source), id.clone());
            tasks.spawn(async move { (id, tokio::time::timeout(timeout, future).await) });
        }

        let mut events = Vec::new();
        let mut skipped = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (institution, result) = joined.map_err(|_| CollectError::TaskFailed)?;
            let failure = match result {
                Ok(Ok(batch)) => {
                    events.extend(batch);
                    continue;
                }
                Ok(Err(source)) => CollectError::Fetch {
                    institution: institution.clone(),
                    source,
                },
                Err(_) => CollectError::Timeout {
                    institution: institution.clone(),
                    timeout,
                },
            };

            match self.config.partial_data {
                // Dropping the JoinSet aborts the remaining fetches, so the
                // failed collection leaves nothing visible downstream.
                PartialDataPolicy::Fail => return Err(failure),
                PartialDataPolicy::Proceed => {
                    log::warn!("skipping institution '{institution}': {failure}");
                    skipped.push(institution);
                }
            }
        }

        skipped.sort();
        Ok(Collected { events, skipped })
    }
}
