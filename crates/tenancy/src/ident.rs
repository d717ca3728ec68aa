//! Tenant identifier validation.
//!
//! Schema names cannot be supplied as bound query parameters, so any DDL
//! or DML that targets a tenant schema must interpolate the identifier
//! into SQL text. The rule here is "validate, then quote": the only type
//! that may ever be formatted into SQL is [`SchemaName`], which can only
//! be constructed through validation, and callers re-validate at the
//! point of use rather than trusting stored values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TenantError;

/// Names that can never be used as a tenant slug or schema name.
///
/// Covers PostgreSQL system schemas plus platform route prefixes.
/// Matching is case-insensitive.
pub const RESERVED_NAMES: &[&str] = &[
    "public",
    "pg_catalog",
    "information_schema",
    "pg_toast",
    "admin",
    "root",
    "system",
    "postgres",
    "template0",
    "template1",
    "platform",
    "api",
    "www",
    "app",
    "health",
    "docs",
];

/// PostgreSQL identifier length limit.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Returns `true` if the name is in the reserved set (case-insensitive).
pub fn is_reserved(name: &str) -> bool {
    let lower = name.to_lowercase();
    RESERVED_NAMES.iter().any(|&r| r == lower)
}

/// Validates a tenant slug.
///
/// Rules:
/// - 1-63 characters
/// - lowercase letters, digits, and hyphens only
/// - must start and end with an alphanumeric character
/// - must not be a reserved name
pub fn validate_slug(slug: &str) -> Result<(), TenantError> {
    if slug.is_empty() {
        return Err(TenantError::invalid("slug cannot be empty"));
    }

    if slug.len() > MAX_IDENTIFIER_LEN {
        return Err(TenantError::invalid(format!(
            "slug exceeds {MAX_IDENTIFIER_LEN} characters: {slug}"
        )));
    }

    if is_reserved(slug) {
        return Err(TenantError::invalid(format!("slug '{slug}' is reserved")));
    }

    let bytes = slug.as_bytes();
    let first_ok = bytes[0].is_ascii_lowercase() || bytes[0].is_ascii_digit();
    let last_ok = bytes[bytes.len() - 1].is_ascii_lowercase() || bytes[bytes.len() - 1].is_ascii_digit();
    let body_ok = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if !(first_ok && last_ok && body_ok) {
        return Err(TenantError::invalid(format!(
            "slug must contain only lowercase letters, digits, and hyphens, \
             and must start and end alphanumeric: {slug}"
        )));
    }

    Ok(())
}

/// Validates a PostgreSQL schema name.
///
/// Rules:
/// - 3-63 characters
/// - must start with a lowercase letter
/// - lowercase letters, digits, and underscores only
/// - must not be a reserved name
pub fn validate_schema_name(schema: &str) -> Result<(), TenantError> {
    if schema.is_empty() {
        return Err(TenantError::invalid("schema name cannot be empty"));
    }

    if is_reserved(schema) {
        return Err(TenantError::invalid(format!(
            "schema name '{schema}' is reserved"
        )));
    }

    if schema.len() < 3 || schema.len() > MAX_IDENTIFIER_LEN {
        return Err(TenantError::invalid(format!(
            "schema name must be 3-{MAX_IDENTIFIER_LEN} characters: {schema}"
        )));
    }

    let mut chars = schema.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let body_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if !(first_ok && body_ok) {
        return Err(TenantError::invalid(format!(
            "schema name must start with a letter and contain only \
             lowercase letters, digits, and underscores: {schema}"
        )));
    }

    Ok(())
}

/// Sanitizes an arbitrary string into a safe SQL identifier.
///
/// This is a fallback for derived names; inputs should be validated
/// first. Strips everything outside `[a-z0-9_]`, prefixes `tenant_` when
/// the result does not start with a letter, and truncates to the
/// PostgreSQL identifier limit.
pub fn sanitize_identifier(identifier: &str) -> String {
    let mut sanitized: String = identifier
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();

    if !sanitized.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
        sanitized = format!("tenant_{sanitized}");
    }

    sanitized.truncate(MAX_IDENTIFIER_LEN);
    sanitized
}

/// A validated PostgreSQL schema identifier.
///
/// This is the only type in the crate that may be interpolated into SQL
/// text, and it can only be constructed through [`SchemaName::parse`],
/// which enforces [`validate_schema_name`]. Interpolation always goes
/// through [`SchemaName::quoted`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaName(String);

impl SchemaName {
    /// Validates and wraps a schema name.
    pub fn parse(schema: &str) -> Result<Self, TenantError> {
        validate_schema_name(schema)?;
        Ok(Self(schema.to_string()))
    }

    /// Derives the default schema name for a tenant slug
    /// (`tenant_` + slug, then validated).
    ///
    /// Slugs whose characters are not legal in a schema name (hyphens,
    /// notably) have no default; the caller must supply an explicit
    /// schema name.
    pub fn for_slug(slug: &str) -> Result<Self, TenantError> {
        validate_slug(slug)?;
        Self::parse(&format!("tenant_{slug}"))
    }

    /// Returns the schema name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the schema name as a quoted SQL identifier.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaName({})", self.0)
    }
}

impl FromStr for SchemaName {
    type Err = TenantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SchemaName {
    type Error = TenantError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<SchemaName> for String {
    fn from(schema: SchemaName) -> Self {
        schema.0
    }
}

impl AsRef<str> for SchemaName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
