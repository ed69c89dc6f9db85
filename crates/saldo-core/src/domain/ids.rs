use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ValidationError;

const MAX_ID_LEN: usize = 64;

/// Parse and normalize an external identifier to lowercase.
fn parse_identifier(field: &'static str, input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyIdentifier { field });
    }

    let normalized = trimmed.to_ascii_lowercase();
    let len = normalized.chars().count();
    if len > MAX_ID_LEN {
        return Err(ValidationError::IdentifierTooLong {
            field,
            len,
            max: MAX_ID_LEN,
        });
    }

    for (index, ch) in normalized.chars().enumerate() {
        let valid = ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.';
        if !valid {
            return Err(ValidationError::IdentifierInvalidChar { field, ch, index });
        }
    }

    Ok(normalized)
}

/// Normalized identifier of a financial institution (e.g. a bank or telco).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstitutionId(String);

impl InstitutionId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        parse_identifier("institution_id", input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for InstitutionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for InstitutionId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for InstitutionId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<InstitutionId> for String {
    fn from(value: InstitutionId) -> Self {
        value.0
    }
}

/// Normalized identifier of one account within an institution.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        parse_identifier("account_id", input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for AccountId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for AccountId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

/// Mobile-money platform user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(input.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidUserId {
                value: input.to_owned(),
            })
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The unit of "one account's balance history": an account within an
/// institution. This is the dedup key for every cross-entity aggregation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub institution: InstitutionId,
    pub account: AccountId,
}

impl AccountKey {
    pub const fn new(institution: InstitutionId, account: AccountId) -> Self {
        Self {
            institution,
            account,
        }
    }
}

impl Display for AccountKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.institution, self.account)
    }
}
