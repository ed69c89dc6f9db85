//! Windowed financial metrics over collected event streams.
//!
//! Every metric follows the same two-layer shape: a pure `*_from_events`
//! function computable offline, and an async wrapper that drives a
//! [`saldo_core::Collector`] for the spec's day range. Results are one
//! [`saldo_core::Outcome`] per named window; counts are plain `u64` maps
//! since a count is always defined.

pub mod alerts;
pub mod balance;
pub mod cashflow;
pub mod credit;
pub mod error;
pub mod freshness;

pub use error::MetricError;
