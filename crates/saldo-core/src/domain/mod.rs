//! Validated domain value types.
//!
//! Every record kind the engine consumes has exactly one value type,
//! constructed (and validated) once at the collector boundary:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`UtcDateTime`] | RFC3339 instant guaranteed UTC |
//! | [`Day`] | UTC calendar day |
//! | [`InstitutionId`] / [`AccountId`] / [`UserId`] | normalized identifiers |
//! | [`AccountKey`] | `(institution, account)` dedup key |
//! | [`BalanceEvent`] / [`TransactionEvent`] / [`AlertEvent`] | raw records |
//! | [`Institution`] / [`CreditReport`] / [`Tradeline`] | discovery payloads |
//! | [`Window`] / [`WindowSpec`] | named half-open day-intervals |
//! | [`Outcome`] | absent / zero / value three-way aggregation result |

mod day;
mod event;
mod ids;
mod outcome;
mod timestamp;
mod window;

pub use day::{Day, DayRange};
pub use event::{
    AccountCategory, AlertEvent, BalanceEvent, CreditReport, Institution, Timestamped, Tradeline,
    TradelineStatus, TransactionEvent, TransactionImpact,
};
pub use ids::{AccountId, AccountKey, InstitutionId, UserId};
pub use outcome::Outcome;
pub use timestamp::UtcDateTime;
pub use window::{Window, WindowSpec};
