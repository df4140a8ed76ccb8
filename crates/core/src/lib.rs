//! `usersync-core`: domain foundation for the user registry.
//!
//! This crate contains **pure domain** types (no infrastructure concerns): identifiers,
//! normalized value objects, and the user record shared by both stores.

pub mod error;
pub mod id;
pub mod user;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::UserId;
pub use user::{NewUser, UserKey, UserPatch, UserRecord};
pub use value_object::{EmailAddress, TenantDomain, UserName};
