//! Configuration loading and representation.
//!
//! Everything is read once at process start into an immutable [`AppConfig`].
//! Request handling receives the pieces it needs explicitly.

use std::net::SocketAddr;

use thiserror::Error;

use usersync_access::AllowedOrigins;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Connection settings for the primary store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Persistent store settings (PostgreSQL primary, Redis mirror).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentStores {
    pub database: DatabaseConfig,
    pub redis_url: String,
    pub mirror_key_prefix: Option<String>,
}

/// Which store implementations to wire at startup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// In-memory primary and mirror (dev/test).
    #[default]
    InMemory,
    Persistent(PersistentStores),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Origins admitted by the gate, besides `http://localhost`.
    pub allowed_origins: AllowedOrigins,
    pub bind_addr: SocketAddr,
    pub stores: StoreBackend,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::empty(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            stores: StoreBackend::InMemory,
        }
    }
}

impl AppConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using an arbitrary variable lookup (tests inject a map here).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let allowed_origins = var("ALLOWED_ORIGINS")
            .or_else(|| var("ALLOWED_DOMAINS"))
            .map(|raw| AllowedOrigins::parse(&raw))
            .unwrap_or_default();
        if allowed_origins.is_empty() {
            tracing::warn!("no ALLOWED_ORIGINS configured; only http://localhost origins will be admitted");
        }

        let bind_raw = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            var: "BIND_ADDR",
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        let persistent = match var("USE_PERSISTENT_STORES") {
            None => false,
            Some(v) => parse_bool("USE_PERSISTENT_STORES", &v)?,
        };

        let stores = if persistent {
            let url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
                None => DEFAULT_MAX_CONNECTIONS,
                Some(v) => v.trim().parse::<u32>().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                    var: "DATABASE_MAX_CONNECTIONS",
                    value: v.clone(),
                    reason: e.to_string(),
                })?,
            };

            StoreBackend::Persistent(PersistentStores {
                database: DatabaseConfig { url, max_connections },
                redis_url: var("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
                mirror_key_prefix: var("MIRROR_KEY_PREFIX"),
            })
        } else {
            StoreBackend::InMemory
        };

        Ok(Self {
            allowed_origins,
            bind_addr,
            stores,
        })
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
