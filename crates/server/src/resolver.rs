//! Tenant slug resolution from multiple request sources.
//!
//! Sources are tried in priority order (highest to lowest):
//! 1. `tenant` claim in the bearer token
//! 2. `X-Tenant-ID` header
//! 3. Host subdomain (`{tenant}.example.com`)
//!
//! The resolver only identifies a candidate slug; validation,
//! existence, and status checks happen against the registry in the
//! middleware. Candidates pass through unvalidated so that a bad
//! identifier from a higher-trust source is rejected there rather than
//! silently yielding to a lower-trust source.

use axum::http::header::{AUTHORIZATION, HOST};
use axum::http::request::Parts;
use std::fmt;
use std::net::IpAddr;

use crate::claims;
use crate::middleware::X_TENANT_ID;

/// Subdomains that are infrastructure, never tenant slugs.
const RESERVED_SUBDOMAINS: &[&str] = &["www", "api", "app"];

/// Source from which a tenant slug was extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlugSource {
    /// `tenant` claim in the bearer token (highest priority).
    JwtClaim,
    /// `X-Tenant-ID` header.
    Header,
    /// Host subdomain (lowest priority).
    Subdomain,
}

impl SlugSource {
    /// Returns the priority of this source (higher = more authoritative).
    pub fn priority(&self) -> u8 {
        match self {
            SlugSource::JwtClaim => 3,
            SlugSource::Header => 2,
            SlugSource::Subdomain => 1,
        }
    }
}

impl fmt::Display for SlugSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlugSource::JwtClaim => write!(f, "jwt_claim"),
            SlugSource::Header => write!(f, "header"),
            SlugSource::Subdomain => write!(f, "subdomain"),
        }
    }
}

impl Ord for SlugSource {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority().cmp(&other.priority())
    }
}

impl PartialOrd for SlugSource {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of resolving a tenant slug from a request.
#[derive(Debug, Clone)]
pub struct ResolvedSlug {
    /// The candidate tenant slug.
    pub slug: String,
    /// The source that provided it.
    pub source: SlugSource,
}

/// Trait for extracting a tenant slug from a specific request source.
pub trait SlugExtractor: Send + Sync {
    /// Attempts to extract a candidate slug from the request.
    fn extract(&self, parts: &Parts) -> Option<String>;

    /// Returns the source type this extractor handles.
    fn source_type(&self) -> SlugSource;
}

/// Extracts the `tenant` claim from the bearer token.
#[derive(Debug, Default)]
pub struct JwtClaimExtractor;

impl SlugExtractor for JwtClaimExtractor {
    fn extract(&self, parts: &Parts) -> Option<String> {
        let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
        claims::tenant_claim(header)
    }

    fn source_type(&self) -> SlugSource {
        SlugSource::JwtClaim
    }
}

/// Extracts the slug from the X-Tenant-ID header.
#[derive(Debug, Default)]
pub struct HeaderExtractor;

impl SlugExtractor for HeaderExtractor {
    fn extract(&self, parts: &Parts) -> Option<String> {
        parts
            .headers
            .get(&X_TENANT_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    fn source_type(&self) -> SlugSource {
        SlugSource::Header
    }
}

/// Extracts the slug from the Host subdomain.
///
/// Takes the leftmost label of hosts with at least three labels, so
/// `acme.example.com` resolves to `acme` while `example.com` resolves
/// to nothing. Loopback hosts and IP addresses never carry a tenant.
#[derive(Debug, Default)]
pub struct SubdomainExtractor;

impl SlugExtractor for SubdomainExtractor {
    fn extract(&self, parts: &Parts) -> Option<String> {
        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.host())?;

        subdomain_of(host)
    }

    fn source_type(&self) -> SlugSource {
        SlugSource::Subdomain
    }
}

/// Returns the tenant-candidate subdomain of a host, if it has one.
fn subdomain_of(host: &str) -> Option<String> {
    // Strip the port, keeping IPv6 bracket syntax out of the labels.
    let host = host.rsplit_once(':').map_or(host, |(h, _)| h);
    if host.is_empty() || host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
        return None;
    }
    if host == "localhost" || host.ends_with(".localhost") {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 3 {
        return None;
    }

    let first = labels[0].to_lowercase();
    if RESERVED_SUBDOMAINS.contains(&first.as_str()) {
        return None;
    }
    Some(first)
}

/// Resolves a tenant slug from the configured sources.
pub struct SlugResolver {
    extractors: Vec<Box<dyn SlugExtractor>>,
}

impl SlugResolver {
    /// Creates a resolver with all sources in priority order.
    pub fn new() -> Self {
        Self {
            extractors: vec![
                Box::new(JwtClaimExtractor),
                Box::new(HeaderExtractor),
                Box::new(SubdomainExtractor),
            ],
        }
    }

    /// Resolves the candidate slug, if any source provides one.
    pub fn resolve(&self, parts: &Parts) -> Option<ResolvedSlug> {
        for extractor in &self.extractors {
            if let Some(slug) = extractor.extract(parts) {
                return Some(ResolvedSlug {
                    slug,
                    source: extractor.source_type(),
                });
            }
        }
        None
    }
}

impl Default for SlugResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request, Uri};
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    fn make_token(tenant: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"tenant":"{tenant}"}}"#));
        format!("{header}.{payload}.sig")
    }

    fn make_parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri(Uri::try_from("/users").unwrap());
        for (name, value) in headers {
            builder = builder.header(*name, HeaderValue::from_str(value).unwrap());
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_source_priority() {
        assert!(SlugSource::JwtClaim > SlugSource::Header);
        assert!(SlugSource::Header > SlugSource::Subdomain);
    }

    #[test]
    fn test_header_extractor() {
        let extractor = HeaderExtractor;

        let parts = make_parts(&[("x-tenant-id", "acme")]);
        assert_eq!(extractor.extract(&parts), Some("acme".to_string()));

        // Bad identifiers pass through; the middleware rejects them.
        let parts = make_parts(&[("x-tenant-id", "Not A Slug!")]);
        assert_eq!(extractor.extract(&parts), Some("Not A Slug!".to_string()));

        let parts = make_parts(&[]);
        assert_eq!(extractor.extract(&parts), None);
    }

    #[test]
    fn test_jwt_extractor() {
        let extractor = JwtClaimExtractor;
        let token = make_token("acme");

        let parts = make_parts(&[("authorization", &format!("Bearer {token}"))]);
        assert_eq!(extractor.extract(&parts), Some("acme".to_string()));

        let parts = make_parts(&[("authorization", "Bearer garbage")]);
        assert_eq!(extractor.extract(&parts), None);
    }

    #[test]
    fn test_subdomain_of() {
        assert_eq!(subdomain_of("acme.example.com"), Some("acme".to_string()));
        assert_eq!(subdomain_of("acme.example.com:8080"), Some("acme".to_string()));
        assert_eq!(subdomain_of("ACME.example.com"), Some("acme".to_string()));

        // Too few labels.
        assert_eq!(subdomain_of("example.com"), None);
        assert_eq!(subdomain_of("localhost"), None);
        assert_eq!(subdomain_of("acme.localhost"), None);

        // Addresses are never tenants.
        assert_eq!(subdomain_of("127.0.0.1"), None);
        assert_eq!(subdomain_of("127.0.0.1:8080"), None);
        assert_eq!(subdomain_of("[::1]:8080"), None);

        // Infrastructure subdomains.
        assert_eq!(subdomain_of("www.example.com"), None);
        assert_eq!(subdomain_of("api.example.com"), None);
        assert_eq!(subdomain_of("app.example.com"), None);
    }

    #[test]
    fn test_resolver_claim_beats_header() {
        let resolver = SlugResolver::new();
        let token = make_token("claimed");

        let parts = make_parts(&[
            ("authorization", &format!("Bearer {token}")),
            ("x-tenant-id", "headered"),
            ("host", "hosted.example.com"),
        ]);
        let resolved = resolver.resolve(&parts).unwrap();
        assert_eq!(resolved.slug, "claimed");
        assert_eq!(resolved.source, SlugSource::JwtClaim);
    }

    #[test]
    fn test_resolver_keeps_invalid_claim_over_valid_header() {
        // A bad identifier from the highest-trust source must still win
        // so it is rejected downstream instead of falling through.
        let resolver = SlugResolver::new();
        let token = make_token("Claimed-Tenant");

        let parts = make_parts(&[
            ("authorization", &format!("Bearer {token}")),
            ("x-tenant-id", "headered"),
        ]);
        let resolved = resolver.resolve(&parts).unwrap();
        assert_eq!(resolved.slug, "Claimed-Tenant");
        assert_eq!(resolved.source, SlugSource::JwtClaim);
    }

    #[test]
    fn test_resolver_header_beats_subdomain() {
        let resolver = SlugResolver::new();
        let parts = make_parts(&[
            ("x-tenant-id", "headered"),
            ("host", "hosted.example.com"),
        ]);
        let resolved = resolver.resolve(&parts).unwrap();
        assert_eq!(resolved.slug, "headered");
        assert_eq!(resolved.source, SlugSource::Header);
    }

    #[test]
    fn test_resolver_falls_back_to_subdomain() {
        let resolver = SlugResolver::new();
        let parts = make_parts(&[("host", "hosted.example.com")]);
        let resolved = resolver.resolve(&parts).unwrap();
        assert_eq!(resolved.slug, "hosted");
        assert_eq!(resolved.source, SlugSource::Subdomain);
    }

    #[test]
    fn test_resolver_unresolved() {
        let resolver = SlugResolver::new();
        let parts = make_parts(&[("host", "localhost:8080")]);
        assert!(resolver.resolve(&parts).is_none());
    }
}
