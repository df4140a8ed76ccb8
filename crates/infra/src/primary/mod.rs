//! Authoritative user store boundary.
//!
//! The primary store is the source of truth for uniqueness and lookups. It owns
//! the `(email, domain)` uniqueness invariant; the application never locks
//! around it.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryPrimaryStore;
pub use postgres::PostgresPrimaryStore;

use std::sync::Arc;

use thiserror::Error;

use usersync_core::{EmailAddress, NewUser, TenantDomain, UserKey, UserPatch, UserRecord};

/// Primary store operation error. Every variant is fatal to the request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrimaryStoreError {
    /// A user with the same `(email, domain)` already exists.
    #[error("duplicate key: {email} already registered for {domain}")]
    DuplicateKey {
        email: EmailAddress,
        domain: TenantDomain,
    },

    /// No user matched the `(email, domain)` key of an update.
    #[error("user not found")]
    NotFound,

    /// Storage failure (connection, query, decoding, ...).
    #[error("primary store failure: {0}")]
    Backend(String),
}

impl PrimaryStoreError {
    pub(crate) fn duplicate(key: UserKey) -> Self {
        Self::DuplicateKey {
            email: key.email,
            domain: key.domain,
        }
    }
}

/// Authoritative CRUD over user records.
///
/// Implementations must:
/// - reject a `create` whose `(email, domain)` already exists with `DuplicateKey`
/// - match `update` by exact `(email, domain)` and report `NotFound` on zero matches
/// - stamp `created_at` / `updated_at` themselves
/// - return `find_by_domain` results for exactly that domain, newest first
#[async_trait::async_trait]
pub trait PrimaryStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<UserRecord, PrimaryStoreError>;

    async fn update(&self, key: &UserKey, patch: UserPatch) -> Result<UserRecord, PrimaryStoreError>;

    async fn find_by_domain(&self, domain: &TenantDomain) -> Result<Vec<UserRecord>, PrimaryStoreError>;
}

#[async_trait::async_trait]
impl<S> PrimaryStore for Arc<S>
where
    S: PrimaryStore + ?Sized,
{
    async fn create(&self, user: NewUser) -> Result<UserRecord, PrimaryStoreError> {
        (**self).create(user).await
    }

    async fn update(&self, key: &UserKey, patch: UserPatch) -> Result<UserRecord, PrimaryStoreError> {
        (**self).update(key, patch).await
    }

    async fn find_by_domain(&self, domain: &TenantDomain) -> Result<Vec<UserRecord>, PrimaryStoreError> {
        (**self).find_by_domain(domain).await
    }
}
