//! Tenant domain resolution.

use url::Url;
use usersync_core::TenantDomain;

/// Derives the effective tenant domain for a request.
///
/// Candidates are tried in order: explicit query parameter, request body field,
/// then the hostname of the caller's origin. Blank candidates are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantResolver;

impl TenantResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        explicit: Option<&str>,
        body: Option<&str>,
        origin: Option<&str>,
    ) -> Option<TenantDomain> {
        TenantDomain::non_blank(explicit)
            .or_else(|| TenantDomain::non_blank(body))
            .or_else(|| {
                let host = origin.and_then(hostname_from_origin)?;
                tracing::debug!(%host, "tenant domain derived from origin");
                TenantDomain::new(&host).ok()
            })
    }
}

/// Hostname part of an origin (`https://app.acme.com:8443` → `app.acme.com`).
///
/// Fails soft: anything that does not parse as a URL with a host yields `None`.
pub fn hostname_from_origin(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    url.host_str().map(str::to_string)
}
