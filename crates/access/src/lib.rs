//! `usersync-access`: pure request access boundary.
//!
//! Decides whether a caller's origin may reach the registry at all, and which
//! tenant domain a request belongs to. This crate is intentionally decoupled
//! from HTTP and storage.

pub mod origin;
pub mod tenant;

pub use origin::{AllowedOrigins, OriginDenied, OriginGate, ValidatedOrigin};
pub use tenant::{TenantResolver, hostname_from_origin};
