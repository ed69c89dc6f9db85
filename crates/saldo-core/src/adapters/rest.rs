//! Bearer-token REST implementation of [`DataSource`].
//!
//! Wire records are deserialized into loose structs first and converted
//! into validated domain values at this boundary, so nothing unvalidated
//! crosses into the engine. The server sorts results by time descending and
//! filters by range server-side; the adapter requests a wide enough range
//! instead of walking pagination.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::data_source::{
    AlertsRequest, BalancesRequest, CreditReportRequest, DataSource, InstitutionsRequest,
    SourceError, SourceFuture, TransactionsRequest,
};
use crate::domain::{
    AccountCategory, AccountId, AccountKey, AlertEvent, BalanceEvent, CreditReport, Day,
    Institution, InstitutionId, Tradeline, TradelineStatus, TransactionEvent, UtcDateTime,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};
use crate::retry::RetryConfig;
use crate::throttling::RequestThrottle;

/// Connection settings for one data-API deployment.
#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: String,
    pub token: String,
    pub timeout_ms: u64,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
            timeout_ms: 5_000,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// REST data source speaking the financial-data API.
pub struct RestSource {
    http: Arc<dyn HttpClient>,
    config: RestConfig,
    retry: RetryConfig,
    throttle: Option<RequestThrottle>,
}

impl RestSource {
    pub fn new(http: Arc<dyn HttpClient>, config: RestConfig) -> Self {
        Self {
            http,
            config,
            retry: RetryConfig::default(),
            throttle: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_throttle(mut self, throttle: RequestThrottle) -> Self {
        self.throttle = Some(throttle);
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, SourceError> {
        if let Some(throttle) = &self.throttle {
            throttle.acquire().await;
        }

        let auth = HttpAuth::BearerToken(self.config.token.clone());
        let mut attempt = 0u32;
        loop {
            let request = HttpRequest::get(url.clone())
                .with_header("accept", "application/json")
                .with_auth(&auth)
                .with_timeout_ms(self.config.timeout_ms);

            let error = match self.http.execute(request).await {
                Ok(response) if response.is_success() => {
                    return serde_json::from_str(&response.body).map_err(|e| {
                        SourceError::decode(format!("malformed response body: {e}"))
                    });
                }
                Ok(response) => status_error(&response),
                Err(transport) if transport.retryable() => {
                    SourceError::unavailable(transport.message())
                }
                Err(transport) => SourceError::internal(transport.message()),
            };

            if !error.retryable() || attempt >= self.retry.max_retries {
                return Err(error);
            }
            tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
            attempt += 1;
        }
    }

    fn time_range_query(start: UtcDateTime, end: UtcDateTime) -> String {
        format!(
            "utc_starttime={}&utc_endtime={}",
            urlencoding::encode(&start.format_rfc3339()),
            urlencoding::encode(&end.format_rfc3339()),
        )
    }

    fn categories_query(categories: &[AccountCategory]) -> String {
        if categories.is_empty() {
            return String::new();
        }
        let joined = categories
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",");
        format!("&account_types={}", urlencoding::encode(&joined))
    }
}

fn status_error(response: &HttpResponse) -> SourceError {
    match response.status {
        429 => SourceError::rate_limited("rate limit exceeded"),
        status if status >= 500 => SourceError::unavailable(format!("server error {status}")),
        status if status >= 400 => SourceError::invalid_request(format!("request rejected {status}")),
        status => SourceError::internal(format!("unexpected status {status}")),
    }
}

#[derive(Debug, Deserialize)]
struct InstitutionWire {
    institution_id: String,
    #[serde(default)]
    account_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BalanceWire {
    account_id: String,
    timestamp: String,
    balance: f64,
    account_type: String,
}

#[derive(Debug, Deserialize)]
struct TransactionWire {
    account_id: String,
    timestamp: String,
    amount: f64,
    impact: String,
    account_type: String,
}

#[derive(Debug, Deserialize)]
struct AlertWire {
    timestamp: String,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TradelineWire {
    amount: Option<f64>,
    date: String,
}

#[derive(Debug, Default, Deserialize)]
struct TradelinesWire {
    #[serde(default)]
    open: Vec<TradelineWire>,
    #[serde(default)]
    late_payments: Vec<TradelineWire>,
    #[serde(default, rename = "default")]
    defaulted: Vec<TradelineWire>,
    #[serde(default)]
    closed: Vec<TradelineWire>,
}

#[derive(Debug, Deserialize)]
struct CreditReportWire {
    tradelines: TradelinesWire,
}

fn decode<T>(result: Result<T, crate::ValidationError>) -> Result<T, SourceError> {
    result.map_err(|e| SourceError::decode(e.to_string()))
}

/// Bureau dates arrive either as full RFC3339 instants or bare days.
fn parse_wire_instant(value: &str) -> Result<UtcDateTime, SourceError> {
    if let Ok(ts) = UtcDateTime::parse(value) {
        return Ok(ts);
    }
    decode(Day::parse(value)).map(Day::midnight)
}

fn institution_from_wire(wire: InstitutionWire) -> Result<Institution, SourceError> {
    let id = decode(InstitutionId::parse(&wire.institution_id))?;
    let account_types: BTreeSet<AccountCategory> = wire
        .account_types
        .iter()
        .map(|label| AccountCategory::from_label(label))
        .collect();
    Ok(Institution::new(id, account_types))
}

fn balance_from_wire(
    institution: &InstitutionId,
    wire: BalanceWire,
) -> Result<BalanceEvent, SourceError> {
    let account = AccountKey::new(
        institution.clone(),
        decode(AccountId::parse(&wire.account_id))?,
    );
    decode(BalanceEvent::new(
        account,
        parse_wire_instant(&wire.timestamp)?,
        wire.balance,
        AccountCategory::from_label(&wire.account_type),
    ))
}

fn transaction_from_wire(
    institution: &InstitutionId,
    wire: TransactionWire,
) -> Result<TransactionEvent, SourceError> {
    let account = AccountKey::new(
        institution.clone(),
        decode(AccountId::parse(&wire.account_id))?,
    );
    decode(TransactionEvent::new(
        account,
        parse_wire_instant(&wire.timestamp)?,
        wire.amount,
        decode(wire.impact.parse())?,
        AccountCategory::from_label(&wire.account_type),
    ))
}

fn alert_from_wire(institution: &InstitutionId, wire: AlertWire) -> Result<AlertEvent, SourceError> {
    Ok(AlertEvent::new(
        institution.clone(),
        parse_wire_instant(&wire.timestamp)?,
        wire.labels,
    ))
}

fn credit_report_from_wire(wire: CreditReportWire) -> Result<CreditReport, SourceError> {
    let groups = [
        (TradelineStatus::Open, wire.tradelines.open),
        (TradelineStatus::LatePayment, wire.tradelines.late_payments),
        (TradelineStatus::Default, wire.tradelines.defaulted),
        (TradelineStatus::Closed, wire.tradelines.closed),
    ];

    let mut tradelines = Vec::new();
    for (status, entries) in groups {
        for entry in entries {
            tradelines.push(decode(Tradeline::new(
                status,
                entry.amount,
                parse_wire_instant(&entry.date)?,
            ))?);
        }
    }
    Ok(CreditReport::new(tradelines))
}

impl DataSource for RestSource {
    fn institutions(&self, req: InstitutionsRequest) -> SourceFuture<'_, Vec<Institution>> {
        let url = format!("{}/users/{}/institutions", self.config.base_url, req.user);
        Box::pin(async move {
            let wires: Vec<InstitutionWire> = self.get_json(url).await?;
            wires.into_iter().map(institution_from_wire).collect()
        })
    }

    fn balances(&self, req: BalancesRequest) -> SourceFuture<'_, Vec<BalanceEvent>> {
        let url = format!(
            "{}/users/{}/institutions/{}/balances?{}{}",
            self.config.base_url,
            req.user,
            req.institution,
            Self::time_range_query(req.start, req.end),
            Self::categories_query(&req.categories),
        );
        Box::pin(async move {
            let wires: Vec<BalanceWire> = self.get_json(url).await?;
            wires
                .into_iter()
                .map(|wire| balance_from_wire(&req.institution, wire))
                .collect()
        })
    }

    fn transactions(&self, req: TransactionsRequest) -> SourceFuture<'_, Vec<TransactionEvent>> {
        let url = format!(
            "{}/users/{}/institutions/{}/transactions?{}{}",
            self.config.base_url,
            req.user,
            req.institution,
            Self::time_range_query(req.start, req.end),
            Self::categories_query(&req.categories),
        );
        Box::pin(async move {
            let wires: Vec<TransactionWire> = self.get_json(url).await?;
            wires
                .into_iter()
                .map(|wire| transaction_from_wire(&req.institution, wire))
                .collect()
        })
    }

    fn alerts(&self, req: AlertsRequest) -> SourceFuture<'_, Vec<AlertEvent>> {
        let labels = if req.labels.is_empty() {
            String::new()
        } else {
            format!("&labels={}", urlencoding::encode(&req.labels.join(",")))
        };
        let url = format!(
            "{}/users/{}/institutions/{}/alerts?{}{}",
            self.config.base_url,
            req.user,
            req.institution,
            Self::time_range_query(req.start, req.end),
            labels,
        );
        Box::pin(async move {
            let wires: Vec<AlertWire> = self.get_json(url).await?;
            wires
                .into_iter()
                .map(|wire| alert_from_wire(&req.institution, wire))
                .collect()
        })
    }

    fn credit_report(&self, req: CreditReportRequest) -> SourceFuture<'_, CreditReport> {
        let url = format!("{}/users/{}/creditreport", self.config.base_url, req.user);
        Box::pin(async move {
            let wire: CreditReportWire = self.get_json(url).await?;
            credit_report_from_wire(wire)
        })
    }
}
