use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use usersync_core::{NewUser, TenantDomain, UserId, UserKey, UserPatch, UserRecord};

use super::{PrimaryStore, PrimaryStoreError};

#[derive(Debug, Clone)]
struct StoredUser {
    /// Insertion order; breaks ties between equal `created_at` stamps.
    seq: u64,
    record: UserRecord,
}

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    users: HashMap<UserKey, StoredUser>,
}

/// In-memory primary store.
///
/// Intended for tests/dev. The uniqueness check and insert happen under one
/// write lock, so concurrent creates of the same key see exactly one winner.
#[derive(Debug, Default)]
pub struct InMemoryPrimaryStore {
    inner: RwLock<Inner>,
}

impl InMemoryPrimaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> PrimaryStoreError {
    PrimaryStoreError::Backend("lock poisoned".to_string())
}

#[async_trait::async_trait]
impl PrimaryStore for InMemoryPrimaryStore {
    async fn create(&self, user: NewUser) -> Result<UserRecord, PrimaryStoreError> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;

        let key = user.key();
        if inner.users.contains_key(&key) {
            return Err(PrimaryStoreError::duplicate(key));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: UserId::new(),
            name: user.name,
            email: user.email,
            domain: user.domain,
            created_at: now,
            updated_at: now,
        };

        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.users.insert(
            key,
            StoredUser {
                seq,
                record: record.clone(),
            },
        );

        Ok(record)
    }

    async fn update(&self, key: &UserKey, patch: UserPatch) -> Result<UserRecord, PrimaryStoreError> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;

        let stored = inner.users.get_mut(key).ok_or(PrimaryStoreError::NotFound)?;
        stored.record.name = patch.name;
        stored.record.updated_at = Utc::now();

        Ok(stored.record.clone())
    }

    async fn find_by_domain(&self, domain: &TenantDomain) -> Result<Vec<UserRecord>, PrimaryStoreError> {
        let inner = self.inner.read().map_err(|_| poisoned())?;

        let mut matches: Vec<&StoredUser> = inner
            .users
            .values()
            .filter(|u| &u.record.domain == domain)
            .collect();
        matches.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then(b.seq.cmp(&a.seq))
        });

        Ok(matches.into_iter().map(|u| u.record.clone()).collect())
    }
}
