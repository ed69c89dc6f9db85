use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The result of one windowed aggregation.
///
/// The engine keeps three outcomes distinct end-to-end:
///
/// - `Absent`: nothing qualifying was observed,
/// - `Value(0.0)`: data was observed and the measured value is zero,
/// - `Value(f64::INFINITY)`: a degenerate but meaningful ratio (nonzero
///   debt against zero observed income).
///
/// Collapsing absent into zero is a correctness bug; callers must branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Absent,
    Value(f64),
}

impl Outcome {
    pub const ZERO: Self = Self::Value(0.0);

    pub const fn is_absent(self) -> bool {
        matches!(self, Self::Absent)
    }

    pub const fn as_f64(self) -> Option<f64> {
        match self {
            Self::Absent => None,
            Self::Value(v) => Some(v),
        }
    }

    /// Apply `f` to a present value, leaving `Absent` untouched.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Self::Absent => Self::Absent,
            Self::Value(v) => Self::Value(f(v)),
        }
    }
}

impl From<Option<f64>> for Outcome {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Absent, Self::Value)
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => f.write_str("absent"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_f64().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::from(Option::<f64>::deserialize(deserializer)?))
    }
}
