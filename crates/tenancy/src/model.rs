//! Tenant registry model.
//!
//! The registry row is the durable record of every tenant. It lives in
//! the shared `public` schema, never inside a tenant schema, and is the
//! only place the slug-to-schema mapping is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TenantError;

/// Lifecycle status of a tenant.
///
/// Transitions: `Provisioning -> Active` (create succeeds),
/// `Active <-> Suspended`, `Active | Suspended -> Deprovisioning ->
/// Inactive`. `Inactive` is terminal. A row that fails provisioning
/// stays in `Provisioning` so the stuck state is visible to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Provisioning,
    Active,
    Suspended,
    Deprovisioning,
    Inactive,
}

impl TenantStatus {
    /// Returns the status as its stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Provisioning => "provisioning",
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Deprovisioning => "deprovisioning",
            TenantStatus::Inactive => "inactive",
        }
    }

    /// Parses a stored status string.
    pub fn parse(s: &str) -> Result<Self, TenantError> {
        match s {
            "provisioning" => Ok(TenantStatus::Provisioning),
            "active" => Ok(TenantStatus::Active),
            "suspended" => Ok(TenantStatus::Suspended),
            "deprovisioning" => Ok(TenantStatus::Deprovisioning),
            "inactive" => Ok(TenantStatus::Inactive),
            other => Err(TenantError::invalid(format!(
                "unknown tenant status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TenantStatus {
    type Err = TenantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TenantStatus::parse(s)
    }
}

/// A tenant registry row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Stable external identifier; immutable after creation.
    pub slug: String,
    /// Name of the tenant's isolation schema; immutable after creation.
    pub schema_name: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Admin contact email.
    pub admin_email: Option<String>,
    /// Lifecycle status.
    pub status: TenantStatus,
    /// Open key/value map for tenant-specific feature flags.
    pub config: Map<String, Value>,
    /// Optional user cap, enforced by collaborators.
    pub max_users: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub suspended_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Returns `true` if the tenant is in the active state.
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// Fields required to create a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    /// Unique tenant slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Schema name; derived from the slug when omitted.
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
    #[serde(default)]
    pub max_users: Option<i32>,
}

impl CreateTenant {
    /// Creates a minimal request with just a slug and display name.
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            schema_name: None,
            admin_email: None,
            description: None,
            config: None,
            max_users: None,
        }
    }
}

/// Mutable tenant metadata; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub admin_email: Option<String>,
    pub config: Option<Map<String, Value>>,
    pub max_users: Option<i32>,
}
