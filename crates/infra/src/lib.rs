//! Infrastructure layer: store adapters, the dual-write pipeline, config and
//! process-wide clients.

pub mod clients;
pub mod config;
pub mod mirror;
pub mod primary;
pub mod sync;

pub use config::{AppConfig, ConfigError, StoreBackend};
pub use mirror::{InMemoryMirror, MirrorError, MirrorId, SecondaryMirror};
pub use primary::{InMemoryPrimaryStore, PostgresPrimaryStore, PrimaryStore, PrimaryStoreError};
pub use sync::{MirrorStatus, SyncError, SyncOperation, SyncOrchestrator, SyncOutcome};
