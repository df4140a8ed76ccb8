//! Postgres-backed primary store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | PrimaryStoreError |
//! |------------|----------------------|-------------------|
//! | Database (unique violation) | `23505` | `DuplicateKey` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Io / other | N/A | `Backend` |
//!
//! Uniqueness of `(email, domain)` is a unique index, so concurrent inserts of
//! the same key are arbitrated by the database.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use usersync_core::{EmailAddress, NewUser, TenantDomain, UserId, UserKey, UserName, UserPatch, UserRecord};

use super::{PrimaryStore, PrimaryStoreError};
use crate::clients;
use crate::config::DatabaseConfig;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        email       TEXT NOT NULL,
        domain      TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_domain_key ON users (email, domain)",
    "CREATE INDEX IF NOT EXISTS users_domain_created_at_idx ON users (domain, created_at DESC)",
];

const RETURNING: &str = "id, name, email, domain, created_at, updated_at";

/// Postgres-backed primary store.
///
/// Holds a clone of the process-wide pool; construct via [`PostgresPrimaryStore::connect`]
/// so the pool and schema are initialized once per process.
#[derive(Debug, Clone)]
pub struct PostgresPrimaryStore {
    pool: PgPool,
}

impl PostgresPrimaryStore {
    /// Wrap an existing pool. The caller is responsible for the schema.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach to the shared pool (initializing it if absent) and ensure the schema.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, PrimaryStoreError> {
        let pool = clients::shared_pg_pool(config)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the table and indexes if they do not exist (idempotent).
    pub async fn ensure_schema(&self) -> Result<(), PrimaryStoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PrimaryStore for PostgresPrimaryStore {
    #[instrument(skip(self, user), fields(domain = %user.domain), err)]
    async fn create(&self, user: NewUser) -> Result<UserRecord, PrimaryStoreError> {
        let sql = format!(
            "INSERT INTO users (id, name, email, domain) VALUES ($1, $2, $3, $4) RETURNING {RETURNING}"
        );
        let id = UserId::new();
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .bind(user.name.as_str())
            .bind(user.email.as_str())
            .bind(user.domain.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    PrimaryStoreError::duplicate(user.key())
                } else {
                    map_sqlx_error("create", e)
                }
            })?;

        row_to_record(&row)
    }

    #[instrument(skip(self, key, patch), fields(domain = %key.domain), err)]
    async fn update(&self, key: &UserKey, patch: UserPatch) -> Result<UserRecord, PrimaryStoreError> {
        let sql = format!(
            "UPDATE users SET name = $1, updated_at = now() WHERE email = $2 AND domain = $3 RETURNING {RETURNING}"
        );
        let row = sqlx::query(&sql)
            .bind(patch.name.as_str())
            .bind(key.email.as_str())
            .bind(key.domain.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", e))?
            .ok_or(PrimaryStoreError::NotFound)?;

        row_to_record(&row)
    }

    #[instrument(skip(self), fields(domain = %domain), err)]
    async fn find_by_domain(&self, domain: &TenantDomain) -> Result<Vec<UserRecord>, PrimaryStoreError> {
        let sql = format!(
            "SELECT {RETURNING} FROM users WHERE domain = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(domain.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_domain", e))?;

        rows.iter().map(row_to_record).collect()
    }
}

fn row_to_record(row: &PgRow) -> Result<UserRecord, PrimaryStoreError> {
    let decode = |e: sqlx::Error| map_sqlx_error("decode_row", e);
    let invalid = |e: usersync_core::DomainError| PrimaryStoreError::Backend(format!("invalid stored row: {e}"));

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let email: String = row.try_get("email").map_err(decode)?;
    let domain: String = row.try_get("domain").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode)?;

    Ok(UserRecord {
        id: UserId::from_uuid(id),
        name: UserName::new(&name).map_err(invalid)?,
        email: EmailAddress::new(&email).map_err(invalid)?,
        domain: TenantDomain::new(&domain).map_err(invalid)?,
        created_at,
        updated_at,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> PrimaryStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            PrimaryStoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            PrimaryStoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => PrimaryStoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_map_to_backend() {
        let err = map_sqlx_error("create", sqlx::Error::PoolClosed);
        assert_eq!(
            err,
            PrimaryStoreError::Backend("connection pool closed in create".to_string())
        );
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
