//! Dual-store write pipeline (application-level orchestration).
//!
//! ## Request Flow
//!
//! ```text
//! (origin already validated, tenant domain resolved by the caller)
//!   ↓
//! 1. Validate fields (missing name/email/domain → Validation)
//!   ↓
//! 2. Primary store write (authoritative; any error aborts here)
//!   ↓
//! 3. Mirror write (awaited, best-effort; errors and misses are logged)
//!   ↓
//! SyncOutcome { record, mirror status }
//! ```
//!
//! The mirror step starts only after the primary commit and never runs when the
//! primary step failed. There is no rollback of a committed primary write, and
//! no retry or reconciliation of a missed mirror write.

use thiserror::Error;
use tracing::{error, instrument, warn};

use usersync_core::{DomainError, NewUser, TenantDomain, UserId, UserPatch, UserRecord};

use crate::mirror::{MirrorId, SecondaryMirror};
use crate::primary::{PrimaryStore, PrimaryStoreError};

/// Fatal outcome of a sync operation. Mirror problems never appear here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Required input missing (including an unresolved tenant domain).
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// Update matched no primary record.
    #[error("user not found")]
    NotFound,

    /// Any other primary store failure, including duplicate keys.
    #[error(transparent)]
    Primary(PrimaryStoreError),
}

impl From<PrimaryStoreError> for SyncError {
    fn from(value: PrimaryStoreError) -> Self {
        match value {
            PrimaryStoreError::NotFound => SyncError::NotFound,
            other => SyncError::Primary(other),
        }
    }
}

/// What happened on the mirror after the primary committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorStatus {
    Committed(MirrorId),
    /// Update found no mirror document for the key.
    NoMatch,
    /// Mirror call failed; the message is for logs and diagnostics only.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Register,
    Modify,
}

/// Successful write: the primary record plus the mirror status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub operation: SyncOperation,
    pub record: UserRecord,
    pub mirror: MirrorStatus,
}

impl SyncOutcome {
    pub fn primary_id(&self) -> UserId {
        self.record.id
    }

    pub fn secondary_id(&self) -> Option<&MirrorId> {
        match &self.mirror {
            MirrorStatus::Committed(id) => Some(id),
            MirrorStatus::NoMatch | MirrorStatus::Failed(_) => None,
        }
    }

    /// Human-readable consistency status for the response envelope.
    pub fn message(&self) -> &'static str {
        match (self.operation, &self.mirror) {
            (SyncOperation::Register, MirrorStatus::Committed(_)) => {
                "User saved to primary store and mirror"
            }
            (SyncOperation::Register, _) => "User saved to primary store only; mirror write failed",
            (SyncOperation::Modify, MirrorStatus::Committed(_)) => {
                "User updated in primary store and mirror"
            }
            (SyncOperation::Modify, MirrorStatus::NoMatch) => {
                "User updated in primary store only; no mirror record matched"
            }
            (SyncOperation::Modify, MirrorStatus::Failed(_)) => {
                "User updated in primary store only; mirror update failed"
            }
        }
    }
}

/// Sequences validation, the primary write and the best-effort mirror write.
///
/// ## Generic Parameters
///
/// - `P`: primary store (`PrimaryStore`)
/// - `M`: mirror (`SecondaryMirror`)
pub struct SyncOrchestrator<P, M> {
    primary: P,
    mirror: M,
}

impl<P, M> SyncOrchestrator<P, M>
where
    P: PrimaryStore,
    M: SecondaryMirror,
{
    pub fn new(primary: P, mirror: M) -> Self {
        Self { primary, mirror }
    }

    /// Register a new user in both stores.
    #[instrument(skip_all, fields(domain = domain.as_ref().map(|d| d.as_str())))]
    pub async fn register(
        &self,
        name: Option<&str>,
        email: Option<&str>,
        domain: Option<TenantDomain>,
    ) -> Result<SyncOutcome, SyncError> {
        let user = NewUser::from_parts(name, email, domain)?;

        let record = self.primary.create(user.clone()).await?;

        let mirror = match self.mirror.create(&user).await {
            Ok(id) => MirrorStatus::Committed(id),
            Err(e) => {
                error!(primary_id = %record.id, error = %e, "mirror create failed");
                MirrorStatus::Failed(e.to_string())
            }
        };

        Ok(SyncOutcome {
            operation: SyncOperation::Register,
            record,
            mirror,
        })
    }

    /// Rename the user identified by `(email, domain)` in both stores.
    #[instrument(skip_all, fields(domain = domain.as_ref().map(|d| d.as_str())))]
    pub async fn modify(
        &self,
        email: Option<&str>,
        domain: Option<TenantDomain>,
        name: Option<&str>,
    ) -> Result<SyncOutcome, SyncError> {
        let (key, patch) = UserPatch::from_parts(name, email, domain)?;

        let record = self.primary.update(&key, patch.clone()).await?;

        let mirror = match self.mirror.update(&key, &patch).await {
            Ok(Some(id)) => MirrorStatus::Committed(id),
            Ok(None) => {
                warn!(primary_id = %record.id, domain = %key.domain, "mirror has no record to update");
                MirrorStatus::NoMatch
            }
            Err(e) => {
                error!(primary_id = %record.id, error = %e, "mirror update failed");
                MirrorStatus::Failed(e.to_string())
            }
        };

        Ok(SyncOutcome {
            operation: SyncOperation::Modify,
            record,
            mirror,
        })
    }

    /// List a tenant's users from the primary store. The mirror is never read.
    #[instrument(skip_all, fields(domain = domain.as_ref().map(|d| d.as_str())))]
    pub async fn list(&self, domain: Option<TenantDomain>) -> Result<Vec<UserRecord>, SyncError> {
        let domain = domain.ok_or_else(|| DomainError::missing("domain"))?;
        Ok(self.primary.find_by_domain(&domain).await?)
    }
}
