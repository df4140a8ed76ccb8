//! Secondary mirror boundary.
//!
//! The mirror is an advisory copy of user data. It generates its own document
//! ids and is located by an `(email, domain)` query, never by the primary id.
//! Callers treat every error here as non-fatal.

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_hash;

pub use in_memory::InMemoryMirror;
#[cfg(feature = "redis")]
pub use redis_hash::RedisMirror;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use usersync_core::{NewUser, UserKey, UserPatch};

/// Mirror-generated document identifier. Unrelated to the primary `UserId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MirrorId(String);

impl MirrorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for MirrorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error("mirror connection error: {0}")]
    Connection(String),

    #[error("mirror command error: {0}")]
    Command(String),
}

/// Best-effort CRUD over the mirror.
#[async_trait::async_trait]
pub trait SecondaryMirror: Send + Sync {
    /// Insert a new document; returns the mirror's own id for it.
    async fn create(&self, user: &NewUser) -> Result<MirrorId, MirrorError>;

    /// Patch the first document matching `key`. `Ok(None)` when nothing matches.
    async fn update(&self, key: &UserKey, patch: &UserPatch) -> Result<Option<MirrorId>, MirrorError>;
}

#[async_trait::async_trait]
impl<M> SecondaryMirror for Arc<M>
where
    M: SecondaryMirror + ?Sized,
{
    async fn create(&self, user: &NewUser) -> Result<MirrorId, MirrorError> {
        (**self).create(user).await
    }

    async fn update(&self, key: &UserKey, patch: &UserPatch) -> Result<Option<MirrorId>, MirrorError> {
        (**self).update(key, patch).await
    }
}
