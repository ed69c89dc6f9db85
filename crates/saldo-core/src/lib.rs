//! Core engine for reconstructing sparse balance histories and reducing
//! financial event streams over trailing day windows.
//!
//! The crate is split along one seam: everything under [`domain`], [`series`],
//! [`aggregate`] and [`reduce`] is pure computation over validated values,
//! while [`data_source`], [`collector`] and [`adapters`] handle fetching those
//! values concurrently from a remote financial-data API.
//!
//! The computation layer never errors on statistical degeneracy. An empty
//! window, a fully unknown series or a zero denominator produce an
//! [`Outcome`], not an `Err`; only malformed inputs and collection failures
//! are reported as errors.

pub mod adapters;
pub mod aggregate;
pub mod collector;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod reduce;
pub mod retry;
pub mod series;
pub mod throttling;

pub use aggregate::MissingPolicy;
pub use collector::{Collected, CollectError, Collector, CollectorConfig, PartialDataPolicy};
pub use data_source::{DataSource, SourceError, SourceErrorKind};
pub use domain::{
    AccountCategory, AccountId, AccountKey, AlertEvent, BalanceEvent, CreditReport, Day,
    Institution, InstitutionId, Outcome, Timestamped, Tradeline, TradelineStatus,
    TransactionEvent, TransactionImpact, UserId, UtcDateTime, Window, WindowSpec,
};
pub use error::ValidationError;
pub use series::{DailySeries, StalenessPolicy};
