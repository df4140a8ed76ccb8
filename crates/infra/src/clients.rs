//! Process-wide store clients.
//!
//! Each client is created at most once per process (initialize-if-absent) and
//! then cloned into the adapters that need it. Clones share the underlying pool.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::OnceCell;

use crate::config::DatabaseConfig;

static PG_POOL: OnceCell<PgPool> = OnceCell::const_new();

/// The shared Postgres pool, connecting on first use.
///
/// Later calls return the existing pool and ignore `config`.
pub async fn shared_pg_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PG_POOL
        .get_or_try_init(|| async {
            tracing::info!(max_connections = config.max_connections, "connecting primary store pool");
            PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.url)
                .await
        })
        .await
        .cloned()
}

#[cfg(feature = "redis")]
static REDIS_CLIENT: std::sync::OnceLock<redis::Client> = std::sync::OnceLock::new();

/// The shared Redis client, opened on first use.
///
/// Later calls return the existing client and ignore `url`.
#[cfg(feature = "redis")]
pub fn shared_redis_client(url: &str) -> redis::RedisResult<redis::Client> {
    if let Some(client) = REDIS_CLIENT.get() {
        return Ok(client.clone());
    }
    let client = redis::Client::open(url)?;
    // A concurrent initializer may have won; either client is equivalent.
    Ok(REDIS_CLIENT.get_or_init(|| client).clone())
}
