use thiserror::Error;

/// Validation and contract errors exposed by `saldo-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    EmptyIdentifier { field: &'static str },
    #[error("{field} length {len} exceeds max {max}")]
    IdentifierTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("{field} contains invalid character '{ch}' at index {index}")]
    IdentifierInvalidChar {
        field: &'static str,
        ch: char,
        index: usize,
    },
    #[error("user id must be a UUID: '{value}'")]
    InvalidUserId { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("day must be formatted YYYY-MM-DD: '{value}'")]
    InvalidDay { value: String },
    #[error("day offset of {days} days is out of range")]
    DayOutOfRange { days: i64 },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("invalid transaction impact '{value}', expected CREDIT or DEBIT")]
    InvalidImpact { value: String },
    #[error("invalid tradeline status '{value}'")]
    InvalidTradelineStatus { value: String },

    #[error("window name cannot be empty")]
    EmptyWindowName,
    #[error("window '{name}' must end after it starts")]
    WindowEmpty { name: String },
    #[error("window spec must contain at least one window")]
    EmptyWindowSpec,
    #[error("duplicate window name '{name}'")]
    DuplicateWindowName { name: String },
    #[error("windows '{first}' and '{second}' overlap")]
    WindowsOverlap { first: String, second: String },
    #[error("windows '{first}' and '{second}' leave a gap")]
    WindowsNotContiguous { first: String, second: String },
    #[error("trailing window edges must be strictly ascending and nonzero")]
    WindowEdgesNotAscending,

    #[error("series range start must not be after end")]
    InvalidDayRange,
    #[error("cannot aggregate an empty set of account series")]
    EmptySeriesSet,
    #[error("account series cover different day ranges")]
    SeriesRangeMismatch,
}
