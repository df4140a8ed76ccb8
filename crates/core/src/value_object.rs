//! Normalized value objects for user fields.
//!
//! Each type is immutable and compared by value. Construction is the only place
//! normalization happens, so a held value is always trimmed and non-empty.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

fn non_blank(raw: &str, field: &'static str) -> DomainResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::missing(field));
    }
    Ok(trimmed.to_string())
}

/// Tenant partition key (a web domain such as `acme.com`).
///
/// Compared case-sensitively; no lower-casing is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantDomain(String);

impl TenantDomain {
    pub fn new(raw: &str) -> DomainResult<Self> {
        non_blank(raw, "domain").map(Self)
    }

    /// Like [`TenantDomain::new`], but treats blank input as absent.
    pub fn non_blank(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|r| Self::new(r).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// User email address: trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn new(raw: &str) -> DomainResult<Self> {
        non_blank(raw, "email").map(|s| Self(s.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Display name of a user: trimmed, otherwise kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName(String);

impl UserName {
    pub fn new(raw: &str) -> DomainResult<Self> {
        non_blank(raw, "name").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_string_value {
    ($t:ty) => {
        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(&value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_string_value!(TenantDomain);
impl_string_value!(EmailAddress);
impl_string_value!(UserName);
