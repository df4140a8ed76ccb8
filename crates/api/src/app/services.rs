use std::sync::Arc;

use anyhow::Context;

use usersync_access::TenantResolver;
use usersync_infra::{
    InMemoryMirror, InMemoryPrimaryStore, PostgresPrimaryStore, PrimaryStore, SecondaryMirror, StoreBackend,
    SyncOrchestrator, config::PersistentStores,
};

pub type DynPrimaryStore = Arc<dyn PrimaryStore>;
pub type DynMirror = Arc<dyn SecondaryMirror>;

/// Request-independent services shared by all handlers.
pub struct AppServices {
    sync: SyncOrchestrator<DynPrimaryStore, DynMirror>,
    resolver: TenantResolver,
}

impl AppServices {
    pub fn new(primary: DynPrimaryStore, mirror: DynMirror) -> Self {
        Self {
            sync: SyncOrchestrator::new(primary, mirror),
            resolver: TenantResolver::new(),
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryPrimaryStore::new()), Arc::new(InMemoryMirror::new()))
    }

    pub fn sync(&self) -> &SyncOrchestrator<DynPrimaryStore, DynMirror> {
        &self.sync
    }

    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }
}

pub async fn build_services(stores: &StoreBackend) -> anyhow::Result<Arc<AppServices>> {
    match stores {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory primary store and mirror");
            Ok(Arc::new(AppServices::in_memory()))
        }
        StoreBackend::Persistent(cfg) => build_persistent_services(cfg).await.map(Arc::new),
    }
}

async fn build_persistent_services(cfg: &PersistentStores) -> anyhow::Result<AppServices> {
    let primary = PostgresPrimaryStore::connect(&cfg.database)
        .await
        .context("failed to initialize primary store")?;
    let mirror = persistent_mirror(cfg)?;

    tracing::info!("using postgres primary store");
    Ok(AppServices::new(Arc::new(primary), mirror))
}

#[cfg(feature = "redis")]
fn persistent_mirror(cfg: &PersistentStores) -> anyhow::Result<DynMirror> {
    let client = usersync_infra::clients::shared_redis_client(&cfg.redis_url)
        .context("failed to open redis client for mirror")?;
    tracing::info!("using redis mirror");
    Ok(Arc::new(usersync_infra::mirror::RedisMirror::new(
        client,
        cfg.mirror_key_prefix.clone(),
    )))
}

#[cfg(not(feature = "redis"))]
fn persistent_mirror(_cfg: &PersistentStores) -> anyhow::Result<DynMirror> {
    tracing::warn!("built without the `redis` feature; mirror is in-memory");
    Ok(Arc::new(InMemoryMirror::new()))
}
