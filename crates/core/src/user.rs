//! User record and the request-side shapes that produce it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::UserId;
use crate::value_object::{EmailAddress, TenantDomain, UserName};

/// Lookup identity of a user, valid in both stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserKey {
    pub email: EmailAddress,
    pub domain: TenantDomain,
}

/// Validated input for a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: UserName,
    pub email: EmailAddress,
    pub domain: TenantDomain,
}

/// Mutable fields of a user. `updated_at` is stamped by each store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPatch {
    pub name: UserName,
}

/// Authoritative user record as held by the primary store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub name: UserName,
    pub email: EmailAddress,
    pub domain: TenantDomain,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn key(&self) -> UserKey {
        UserKey {
            email: self.email.clone(),
            domain: self.domain.clone(),
        }
    }
}

impl NewUser {
    /// Validate raw registration fields, reporting every missing one at once.
    pub fn from_parts(
        name: Option<&str>,
        email: Option<&str>,
        domain: Option<TenantDomain>,
    ) -> DomainResult<Self> {
        let mut missing = Vec::new();
        let name = field("name", name, UserName::new, &mut missing);
        let email = field("email", email, EmailAddress::new, &mut missing);
        if domain.is_none() {
            missing.push("domain");
        }

        match (name, email, domain) {
            (Some(name), Some(email), Some(domain)) => Ok(Self { name, email, domain }),
            _ => Err(DomainError::MissingFields(missing)),
        }
    }

    pub fn key(&self) -> UserKey {
        UserKey {
            email: self.email.clone(),
            domain: self.domain.clone(),
        }
    }
}

impl UserPatch {
    /// Validate raw update fields: the match key plus the new name.
    pub fn from_parts(
        name: Option<&str>,
        email: Option<&str>,
        domain: Option<TenantDomain>,
    ) -> DomainResult<(UserKey, Self)> {
        let mut missing = Vec::new();
        let name = field("name", name, UserName::new, &mut missing);
        let email = field("email", email, EmailAddress::new, &mut missing);
        if domain.is_none() {
            missing.push("domain");
        }

        match (name, email, domain) {
            (Some(name), Some(email), Some(domain)) => Ok((UserKey { email, domain }, Self { name })),
            _ => Err(DomainError::MissingFields(missing)),
        }
    }
}

fn field<T>(
    name: &'static str,
    raw: Option<&str>,
    parse: impl Fn(&str) -> DomainResult<T>,
    missing: &mut Vec<&'static str>,
) -> Option<T> {
    match raw.map(parse) {
        Some(Ok(v)) => Some(v),
        // Absent and blank both count as missing.
        Some(Err(_)) | None => {
            missing.push(name);
            None
        }
    }
}
