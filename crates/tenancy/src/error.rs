//! Error types for the tenancy layer.
//!
//! All tenant resolution, validation, and lifecycle failures are expressed
//! as [`TenantError`]. The HTTP layer is the single place these are
//! translated into transport responses; nothing below it produces an
//! HTTP-shaped error.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type TenancyResult<T> = Result<T, TenantError>;

/// The primary error type for tenant operations.
#[derive(Error, Debug)]
pub enum TenantError {
    /// No tenant identifier could be resolved, or the identifier is not
    /// present in the registry.
    #[error("tenant not found: {identifier}")]
    NotFound {
        /// The identifier that failed to resolve, or a description of why
        /// no identifier was available.
        identifier: String,
    },

    /// A tenant identifier or schema name failed validation, or a tenant
    /// with the same slug/schema already exists.
    #[error("invalid tenant: {reason}")]
    Invalid {
        /// Why the identifier was rejected.
        reason: String,
    },

    /// The resolved tenant exists but is not in the active state.
    #[error("tenant is inactive: {slug}")]
    Inactive {
        /// Slug of the inactive tenant.
        slug: String,
    },

    /// The provisioning workflow failed after the registry insert.
    ///
    /// The registry row is left in the provisioning state for operator
    /// follow-up; the backing schema has been dropped (best effort).
    #[error("tenant provisioning failed: {reason}")]
    ProvisionFailed {
        /// Root cause of the provisioning failure.
        reason: String,
    },

    /// The deprovisioning workflow failed part-way through.
    ///
    /// The registry row is left in the deprovisioning state for operator
    /// follow-up.
    #[error("tenant deprovisioning failed: {reason}")]
    DeprovisionFailed {
        /// Root cause of the deprovisioning failure.
        reason: String,
    },

    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// Pool construction error.
    #[error("pool configuration error: {0}")]
    PoolBuild(#[from] deadpool_postgres::BuildError),
}

impl TenantError {
    /// Creates a [`TenantError::NotFound`] for the given identifier.
    pub fn not_found(identifier: impl Into<String>) -> Self {
        TenantError::NotFound {
            identifier: identifier.into(),
        }
    }

    /// Creates a [`TenantError::Invalid`] with the given reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        TenantError::Invalid {
            reason: reason.into(),
        }
    }

    /// Creates a [`TenantError::Inactive`] for the given slug.
    pub fn inactive(slug: impl Into<String>) -> Self {
        TenantError::Inactive { slug: slug.into() }
    }

    /// Returns `true` if this error indicates a uniqueness violation or
    /// other validation failure attributable to the caller's input.
    pub fn is_invalid(&self) -> bool {
        matches!(self, TenantError::Invalid { .. })
    }
}

/// PostgreSQL SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Translates a database error into [`TenantError`], mapping unique
/// constraint violations on the registry to [`TenantError::Invalid`].
///
/// The registry's unique constraints on `slug` and `schema_name` are the
/// sole guard against concurrent duplicate creation: exactly one insert
/// wins, the other surfaces here.
pub fn map_registry_error(err: tokio_postgres::Error) -> TenantError {
    if let Some(db_err) = err.as_db_error() {
        if db_err.code().code() == UNIQUE_VIOLATION {
            return TenantError::Invalid {
                reason: format!("tenant already exists: {}", db_err.message()),
            };
        }
    }
    TenantError::Database(err)
}
