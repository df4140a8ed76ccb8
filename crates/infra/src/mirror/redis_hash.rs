//! Redis-backed mirror.
//!
//! ## Layout
//!
//! - **Document**: hash at `<prefix>:users:<mirror_id>` with `name`, `email`,
//!   `domain`, `createdAt` and, once patched, `updatedAt`
//! - **Query index**: list at `<prefix>:idx:<domain_len>:<domain>:<email>`
//!   holding mirror ids in insertion order; updates patch the head of the list
//!   if its document still exists
//!
//! The domain length keeps the index key unambiguous when either part
//! contains `:`.
//!
//! Nothing here enforces uniqueness. A key registered twice has two documents.

use chrono::Utc;
use redis::aio::MultiplexedConnection;
use tracing::instrument;
use uuid::Uuid;

use usersync_core::{NewUser, UserKey, UserPatch};

use super::{MirrorError, MirrorId, SecondaryMirror};

/// Patch the document at the head of an index list, unless it is gone.
///
/// KEYS[1] index list; ARGV: document key prefix, name, updatedAt.
/// Returns the patched mirror id or nil.
const UPDATE_HEAD_SCRIPT: &str = r"
local id = redis.call('LINDEX', KEYS[1], 0)
if not id then return false end
local doc = ARGV[1] .. id
if redis.call('EXISTS', doc) == 0 then return false end
redis.call('HSET', doc, 'name', ARGV[2], 'updatedAt', ARGV[3])
return id
";

/// Default key prefix for mirror documents.
pub const DEFAULT_KEY_PREFIX: &str = "usersync:mirror";

#[derive(Debug, Clone)]
pub struct RedisMirror {
    client: redis::Client,
    prefix: String,
}

impl RedisMirror {
    pub fn new(client: redis::Client, prefix: Option<String>) -> Self {
        Self {
            client,
            prefix: prefix.unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, MirrorError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| MirrorError::Connection(e.to_string()))
    }

    fn document_key(&self, id: &MirrorId) -> String {
        format!("{}:users:{}", self.prefix, id)
    }

    fn index_key(&self, key: &UserKey) -> String {
        let domain = key.domain.as_str();
        format!("{}:idx:{}:{}:{}", self.prefix, domain.len(), domain, key.email)
    }

    fn document_key_prefix(&self) -> String {
        format!("{}:users:", self.prefix)
    }
}

#[async_trait::async_trait]
impl SecondaryMirror for RedisMirror {
    #[instrument(skip(self, user), fields(domain = %user.domain), err)]
    async fn create(&self, user: &NewUser) -> Result<MirrorId, MirrorError> {
        let mut conn = self.connection().await?;

        let id = MirrorId::new(Uuid::new_v4().simple().to_string());
        let fields = [
            ("name", user.name.to_string()),
            ("email", user.email.to_string()),
            ("domain", user.domain.to_string()),
            ("createdAt", Utc::now().to_rfc3339()),
        ];

        // Document and index entry land together or not at all.
        redis::pipe()
            .atomic()
            .hset_multiple(self.document_key(&id), &fields)
            .ignore()
            .rpush(self.index_key(&user.key()), id.as_str())
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| MirrorError::Command(e.to_string()))?;

        Ok(id)
    }

    #[instrument(skip(self, key, patch), fields(domain = %key.domain), err)]
    async fn update(&self, key: &UserKey, patch: &UserPatch) -> Result<Option<MirrorId>, MirrorError> {
        let mut conn = self.connection().await?;

        let patched: Option<String> = redis::Script::new(UPDATE_HEAD_SCRIPT)
            .key(self.index_key(key))
            .arg(self.document_key_prefix())
            .arg(patch.name.as_str())
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| MirrorError::Command(e.to_string()))?;

        Ok(patched.map(MirrorId::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usersync_core::{EmailAddress, TenantDomain};

    #[test]
    fn keys_are_prefixed_and_scoped_by_domain_then_email() {
        let client = redis::Client::open("redis://127.0.0.1:6379").unwrap();
        let mirror = RedisMirror::new(client, None);
        let key = UserKey {
            email: EmailAddress::new("Ann@acme.com").unwrap(),
            domain: TenantDomain::new("acme.com").unwrap(),
        };

        assert_eq!(mirror.index_key(&key), "usersync:mirror:idx:8:acme.com:ann@acme.com");
        assert_eq!(
            mirror.document_key(&MirrorId::new("abc")),
            "usersync:mirror:users:abc"
        );
        assert_eq!(
            format!("{}abc", mirror.document_key_prefix()),
            mirror.document_key(&MirrorId::new("abc"))
        );
    }

    #[test]
    fn index_keys_do_not_collide_across_colon_splits() {
        let client = redis::Client::open("redis://127.0.0.1:6379").unwrap();
        let mirror = RedisMirror::new(client, None);
        let a = UserKey {
            email: EmailAddress::new("y:z").unwrap(),
            domain: TenantDomain::new("x").unwrap(),
        };
        let b = UserKey {
            email: EmailAddress::new("z").unwrap(),
            domain: TenantDomain::new("x:y").unwrap(),
        };

        assert_ne!(mirror.index_key(&a), mirror.index_key(&b));
    }

    /// Runs only against a live server named by `REDIS_URL`.
    #[tokio::test]
    async fn update_skips_an_evicted_document() {
        let Ok(url) = std::env::var("REDIS_URL") else {
            return;
        };
        let client = redis::Client::open(url).unwrap();
        let prefix = format!("usersync:test:{}", Uuid::new_v4().simple());
        let mirror = RedisMirror::new(client.clone(), Some(prefix));

        let user = NewUser::from_parts(Some("Ann"), Some("ann@acme.com"), TenantDomain::non_blank(Some("acme.com")))
            .unwrap();
        let id = mirror.create(&user).await.unwrap();

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        redis::cmd("DEL")
            .arg(mirror.document_key(&id))
            .query_async::<_, ()>(&mut conn)
            .await
            .unwrap();

        let patch = UserPatch {
            name: usersync_core::UserName::new("Annie").unwrap(),
        };
        assert_eq!(mirror.update(&user.key(), &patch).await.unwrap(), None);

        let exists: bool = redis::cmd("EXISTS")
            .arg(mirror.document_key(&id))
            .query_async(&mut conn)
            .await
            .unwrap();
        assert!(!exists);

        redis::cmd("DEL")
            .arg(mirror.index_key(&user.key()))
            .query_async::<_, ()>(&mut conn)
            .await
            .unwrap();
    }
}
