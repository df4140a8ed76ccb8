use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use usersync_core::{NewUser, UserKey, UserPatch};

use super::{MirrorError, MirrorId, SecondaryMirror};

/// A document as held by the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorDocument {
    pub id: MirrorId,
    pub name: String,
    pub email: String,
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// In-memory mirror for tests/dev.
///
/// Like the real mirror it enforces no uniqueness: registering the same key
/// twice yields two documents, and updates touch the first one inserted.
#[derive(Debug, Default)]
pub struct InMemoryMirror {
    docs: Mutex<Vec<MirrorDocument>>,
}

impl InMemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every document, in insertion order.
    pub fn documents(&self) -> Vec<MirrorDocument> {
        self.docs.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

fn poisoned() -> MirrorError {
    MirrorError::Command("lock poisoned".to_string())
}

#[async_trait::async_trait]
impl SecondaryMirror for InMemoryMirror {
    async fn create(&self, user: &NewUser) -> Result<MirrorId, MirrorError> {
        let id = MirrorId::new(Uuid::new_v4().simple().to_string());
        let doc = MirrorDocument {
            id: id.clone(),
            name: user.name.to_string(),
            email: user.email.to_string(),
            domain: user.domain.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.docs.lock().map_err(|_| poisoned())?.push(doc);
        Ok(id)
    }

    async fn update(&self, key: &UserKey, patch: &UserPatch) -> Result<Option<MirrorId>, MirrorError> {
        let mut docs = self.docs.lock().map_err(|_| poisoned())?;
        let Some(doc) = docs
            .iter_mut()
            .find(|d| d.email == key.email.as_str() && d.domain == key.domain.as_str())
        else {
            return Ok(None);
        };

        doc.name = patch.name.to_string();
        doc.updated_at = Some(Utc::now());
        Ok(Some(doc.id.clone()))
    }
}
