use saldo_core::collector::CollectError;
use saldo_core::ValidationError;
use thiserror::Error;

/// Metric-stage failures: collection problems and malformed inputs only.
/// Empty windows, fully unknown series and zero denominators are
/// [`saldo_core::Outcome`] values, never errors.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
