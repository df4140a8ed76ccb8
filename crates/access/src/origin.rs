//! Origin allow-list gate.
//!
//! Every data endpoint sits behind [`OriginGate::validate`]. The allow-list is
//! loaded once at process start and handed to the gate; the gate never reads
//! the environment itself.

use std::collections::BTreeSet;

use thiserror::Error;
use url::Url;

/// Immutable set of exact origins permitted to call the API.
///
/// Entries are compared case-sensitively after stripping a single trailing `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedOrigins(BTreeSet<String>);

impl AllowedOrigins {
    /// An allow-list that admits nothing but the localhost carve-out.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a comma-delimited list (`"https://a.com, https://b.com/"`).
    ///
    /// Blank entries are ignored.
    pub fn parse(raw: &str) -> Self {
        raw.split(',').collect()
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.0.contains(normalize(origin))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for AllowedOrigins {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|s| normalize(s.as_ref().trim()).to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

/// An origin that passed the gate, held exactly as the caller sent it.
///
/// This is the value echoed in `Access-Control-Allow-Origin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrigin(String);

impl ValidatedOrigin {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ValidatedOrigin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OriginDenied {
    #[error("origin header missing")]
    Missing,

    #[error("origin not allowed: {0}")]
    NotAllowed(String),
}

/// Access check on the `Origin` header.
#[derive(Debug, Clone)]
pub struct OriginGate {
    allowed: AllowedOrigins,
}

impl OriginGate {
    pub fn new(allowed: AllowedOrigins) -> Self {
        Self { allowed }
    }

    pub fn allowed(&self) -> &AllowedOrigins {
        &self.allowed
    }

    /// Decide whether `origin` may proceed.
    ///
    /// `http://localhost` on any port is always admitted. Beyond that only exact
    /// allow-list entries pass; there is no prefix or wildcard matching.
    pub fn validate(&self, origin: Option<&str>) -> Result<ValidatedOrigin, OriginDenied> {
        let origin = match origin {
            Some(o) if !o.is_empty() => o,
            _ => return Err(OriginDenied::Missing),
        };

        if is_localhost(origin) || self.allowed.contains(origin) {
            return Ok(ValidatedOrigin(origin.to_string()));
        }

        Err(OriginDenied::NotAllowed(origin.to_string()))
    }
}

fn normalize(origin: &str) -> &str {
    origin.strip_suffix('/').unwrap_or(origin)
}

fn is_localhost(origin: &str) -> bool {
    Url::parse(origin)
        .map(|url| url.scheme() == "http" && url.host_str() == Some("localhost"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gate() -> OriginGate {
        OriginGate::new(AllowedOrigins::parse(
            "https://app.acme.com, https://portal.globex.io/ ,,",
        ))
    }

    #[test]
    fn parse_trims_strips_slash_and_skips_blanks() {
        let allowed = AllowedOrigins::parse(" https://a.com/ ,, https://b.com ");
        assert_eq!(allowed.len(), 2);
        assert_eq!(allowed.iter().collect::<Vec<_>>(), vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn exact_origin_is_allowed_and_echoed_verbatim() {
        let ok = gate().validate(Some("https://app.acme.com")).unwrap();
        assert_eq!(ok.as_str(), "https://app.acme.com");

        let ok = gate().validate(Some("https://portal.globex.io/")).unwrap();
        assert_eq!(ok.as_str(), "https://portal.globex.io/");
    }

    #[test]
    fn comparison_is_case_sensitive() {
        assert!(gate().validate(Some("https://APP.acme.com")).is_err());
    }

    #[test]
    fn missing_origin_is_denied() {
        assert_eq!(gate().validate(None), Err(OriginDenied::Missing));
        assert_eq!(gate().validate(Some("")), Err(OriginDenied::Missing));
    }

    #[test]
    fn no_prefix_or_subdomain_matching() {
        let g = gate();
        assert!(g.validate(Some("https://app.acme.com.evil.net")).is_err());
        assert!(g.validate(Some("https://evil.app.acme.com")).is_err());
        assert!(g.validate(Some("http://app.acme.com")).is_err());
    }

    #[test]
    fn localhost_is_always_allowed_even_with_empty_list() {
        let g = OriginGate::new(AllowedOrigins::empty());
        assert!(g.validate(Some("http://localhost:3000")).is_ok());
        assert!(g.validate(Some("http://localhost")).is_ok());
    }

    #[test]
    fn localhost_lookalikes_are_denied() {
        let g = OriginGate::new(AllowedOrigins::empty());
        assert!(g.validate(Some("http://localhost.evil.com")).is_err());
        assert!(g.validate(Some("https://localhost:3000")).is_err());
        assert!(g.validate(Some("https://app.acme.com")).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: an origin absent from the allow-list (and not localhost) never passes.
        #[test]
        fn unlisted_origins_are_denied(host in "[a-z][a-z0-9]{0,15}\\.(com|net|org)") {
            let origin = format!("https://{host}");
            prop_assume!(origin != "https://app.acme.com");
            prop_assert_eq!(
                gate().validate(Some(&origin)),
                Err(OriginDenied::NotAllowed(origin.clone()))
            );
        }
    }
}
