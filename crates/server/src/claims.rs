//! Bearer token claim extraction.
//!
//! Signature verification happens at the gateway before requests reach
//! this service; here the payload is only decoded to read routing
//! claims. A token that fails to decode simply contributes no claim, so
//! resolution falls through to the next source.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;

/// Claims this service reads from a decoded token payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    /// Tenant slug the token is scoped to.
    #[serde(default)]
    pub tenant: Option<String>,
    /// Subject identifier.
    #[serde(default)]
    pub sub: Option<String>,
}

/// Extracts the token from an `Authorization: Bearer ...` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ").or_else(|| header.strip_prefix("bearer "))?;
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Decodes the payload segment of a JWT without verifying it.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    // A JWT has exactly three segments.
    if segments.next().is_none() || token.matches('.').count() != 2 {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Reads the tenant claim from an Authorization header value, if any.
pub fn tenant_claim(authorization: &str) -> Option<String> {
    let token = bearer_token(authorization)?;
    decode_claims(token)?.tenant.filter(|t| !t.is_empty())
}
