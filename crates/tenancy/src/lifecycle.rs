//! Tenant lifecycle operations.
//!
//! Provisioning is a compensating multi-step workflow rather than a
//! transaction: schema DDL in PostgreSQL cannot be rolled back together
//! with registry writes on a different connection. The registry insert
//! goes first so its primary key serves as the concurrency guard, then
//! schema creation and migration run on a dedicated autocommit
//! connection. On failure the schema is dropped best-effort and the row
//! is left in `provisioning`, where operators can see it.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{TenancyResult, TenantError};
use crate::ident::{validate_slug, SchemaName};
use crate::migrate::SchemaMigrator;
use crate::model::{CreateTenant, Tenant, TenantPatch, TenantStatus};
use crate::pool::TenantPool;
use crate::registry::TenantRegistry;

/// Config key that records why a tenant was suspended.
pub const SUSPENSION_REASON_KEY: &str = "suspension_reason";

/// Hook invoked before a tenant schema is dropped.
#[async_trait]
pub trait SchemaBackup: Send + Sync + 'static {
    async fn backup(&self, client: &tokio_postgres::Client, schema: &SchemaName)
        -> TenancyResult<()>;
}

/// Backup hook that only records that the drop is happening.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackup;

#[async_trait]
impl SchemaBackup for NoopBackup {
    async fn backup(
        &self,
        _client: &tokio_postgres::Client,
        schema: &SchemaName,
    ) -> TenancyResult<()> {
        tracing::info!(schema = %schema, "skipping backup before schema drop");
        Ok(())
    }
}

/// Controls for [`TenantService::deprovision`].
///
/// The schema drop is destructive and must be requested explicitly;
/// the default retires the tenant in the registry and leaves its
/// schema in place for manual inspection or export.
#[derive(Debug, Clone, Copy)]
pub struct DeprovisionOptions {
    pub delete_schema: bool,
    pub backup_first: bool,
}

impl Default for DeprovisionOptions {
    fn default() -> Self {
        Self {
            delete_schema: false,
            backup_first: true,
        }
    }
}

/// Orchestrates tenant provisioning, suspension, and deprovisioning.
#[derive(Clone)]
pub struct TenantService {
    registry: TenantRegistry,
    pool: TenantPool,
    migrator: Arc<dyn SchemaMigrator>,
    backup: Arc<dyn SchemaBackup>,
}

impl std::fmt::Debug for TenantService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantService")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl TenantService {
    pub fn new(
        registry: TenantRegistry,
        pool: TenantPool,
        migrator: Arc<dyn SchemaMigrator>,
        backup: Arc<dyn SchemaBackup>,
    ) -> Self {
        Self {
            registry,
            pool,
            migrator,
            backup,
        }
    }

    /// Returns the registry this service writes through.
    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    /// Fetches a tenant by slug.
    pub async fn get(&self, slug: &str) -> TenancyResult<Tenant> {
        validate_slug(slug)?;
        self.registry
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| TenantError::not_found(slug))
    }

    /// Lists tenants, optionally filtered by status, with paging.
    pub async fn list(
        &self,
        status: Option<TenantStatus>,
        limit: i64,
        offset: i64,
    ) -> TenancyResult<Vec<Tenant>> {
        self.registry.list(status, limit, offset).await
    }

    /// Updates mutable tenant metadata.
    pub async fn update(&self, slug: &str, patch: TenantPatch) -> TenancyResult<Tenant> {
        validate_slug(slug)?;
        self.registry.update(slug, &patch).await
    }

    /// Provisions a new tenant: registry row, schema, migrations.
    pub async fn create(&self, req: CreateTenant) -> TenancyResult<Tenant> {
        validate_slug(&req.slug)?;
        let schema = match &req.schema_name {
            Some(name) => SchemaName::parse(name)?,
            None => SchemaName::for_slug(&req.slug)?,
        };

        // Friendly rejection for the common case; the primary key below
        // is the real guard under concurrency.
        if self.registry.exists(&req.slug, schema.as_str()).await? {
            return Err(TenantError::invalid(format!(
                "tenant already exists: {}",
                req.slug
            )));
        }

        let now = Utc::now();
        let tenant = Tenant {
            slug: req.slug.clone(),
            schema_name: schema.as_str().to_string(),
            name: req.name,
            description: req.description,
            admin_email: req.admin_email,
            status: TenantStatus::Provisioning,
            config: req.config.unwrap_or_default(),
            max_users: req.max_users,
            created_at: now,
            updated_at: now,
            suspended_at: None,
        };

        // The primary key on slug rejects concurrent duplicates here,
        // before any schema exists.
        self.registry.insert(&tenant).await?;
        tracing::info!(slug = %tenant.slug, schema = %schema, "provisioning tenant");

        let mut ddl = self.pool.connect().await?;

        // No IF NOT EXISTS: a pre-existing schema is a conflict, and it
        // must not be dropped during cleanup below.
        if let Err(e) = ddl
            .batch_execute(&format!("CREATE SCHEMA {}", schema.quoted()))
            .await
        {
            tracing::error!(slug = %tenant.slug, "schema creation failed: {e}");
            return Err(TenantError::ProvisionFailed {
                reason: format!("failed to create schema {schema}: {e}"),
            });
        }

        if let Err(e) = self.migrator.migrate(&mut ddl, &schema).await {
            tracing::error!(slug = %tenant.slug, "tenant migration failed: {e}");
            self.drop_schema(&ddl, &schema).await;
            return Err(TenantError::ProvisionFailed {
                reason: format!("failed to migrate schema {schema}: {e}"),
            });
        }

        let tenant = self
            .registry
            .set_status(&tenant.slug, TenantStatus::Active)
            .await?;
        tracing::info!(slug = %tenant.slug, "tenant active");
        Ok(tenant)
    }

    /// Suspends an active tenant, recording the reason if given.
    pub async fn suspend(&self, slug: &str, reason: Option<String>) -> TenancyResult<Tenant> {
        let tenant = self.get(slug).await?;
        ensure_transition(tenant.status, TenantStatus::Suspended)?;

        if let Some(reason) = reason {
            let mut config = tenant.config.clone();
            config.insert(SUSPENSION_REASON_KEY.to_string(), Value::String(reason));
            self.patch_config(slug, config).await?;
        }

        let tenant = self.registry.set_status(slug, TenantStatus::Suspended).await?;
        tracing::info!(slug = %slug, "tenant suspended");
        Ok(tenant)
    }

    /// Reactivates a suspended tenant and clears the suspension reason.
    pub async fn activate(&self, slug: &str) -> TenancyResult<Tenant> {
        let tenant = self.get(slug).await?;
        ensure_transition(tenant.status, TenantStatus::Active)?;

        if tenant.config.contains_key(SUSPENSION_REASON_KEY) {
            let mut config = tenant.config.clone();
            config.remove(SUSPENSION_REASON_KEY);
            self.patch_config(slug, config).await?;
        }

        let tenant = self.registry.set_status(slug, TenantStatus::Active).await?;
        tracing::info!(slug = %slug, "tenant reactivated");
        Ok(tenant)
    }

    /// Retires a tenant, optionally backing up and dropping its schema
    /// per [`DeprovisionOptions`].
    ///
    /// A mid-way failure leaves the row in `deprovisioning` so the
    /// operation can be retried by hand. The registry row survives as
    /// an audit record in `inactive`.
    pub async fn deprovision(
        &self,
        slug: &str,
        opts: DeprovisionOptions,
    ) -> TenancyResult<Tenant> {
        let tenant = self.get(slug).await?;
        ensure_transition(tenant.status, TenantStatus::Deprovisioning)?;
        let schema = SchemaName::parse(&tenant.schema_name)?;

        self.registry
            .set_status(slug, TenantStatus::Deprovisioning)
            .await?;
        tracing::info!(slug = %slug, schema = %schema, "deprovisioning tenant");

        if opts.delete_schema {
            let ddl = self.pool.connect().await?;

            if opts.backup_first {
                if let Err(e) = self.backup.backup(&ddl, &schema).await {
                    return Err(TenantError::DeprovisionFailed {
                        reason: format!("backup failed for schema {schema}: {e}"),
                    });
                }
            }

            if let Err(e) = ddl
                .batch_execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema.quoted()))
                .await
            {
                tracing::error!(slug = %slug, "schema drop failed: {e}");
                return Err(TenantError::DeprovisionFailed {
                    reason: format!("failed to drop schema {schema}: {e}"),
                });
            }
        } else {
            tracing::info!(slug = %slug, schema = %schema, "schema retained on deprovision");
        }

        let tenant = self.registry.set_status(slug, TenantStatus::Inactive).await?;
        tracing::info!(slug = %slug, "tenant inactive");
        Ok(tenant)
    }

    async fn patch_config(&self, slug: &str, config: Map<String, Value>) -> TenancyResult<()> {
        let patch = TenantPatch {
            config: Some(config),
            ..TenantPatch::default()
        };
        self.registry.update(slug, &patch).await?;
        Ok(())
    }

    /// Best-effort cleanup of a schema this service just created.
    async fn drop_schema(&self, client: &tokio_postgres::Client, schema: &SchemaName) {
        if let Err(e) = client
            .batch_execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema.quoted()))
            .await
        {
            tracing::error!(schema = %schema, "cleanup of partially provisioned schema failed: {e}");
        }
    }
}

/// Validates a lifecycle transition against the state machine.
fn ensure_transition(from: TenantStatus, to: TenantStatus) -> TenancyResult<()> {
    // Provisioning -> Active happens only inside create(), after the
    // schema and migrations exist; it is not an operator transition.
    let allowed = matches!(
        (from, to),
        (TenantStatus::Active, TenantStatus::Suspended)
            | (TenantStatus::Suspended, TenantStatus::Active)
            | (TenantStatus::Active, TenantStatus::Deprovisioning)
            | (TenantStatus::Suspended, TenantStatus::Deprovisioning)
            | (TenantStatus::Deprovisioning, TenantStatus::Inactive)
    );
    if allowed {
        Ok(())
    } else {
        Err(TenantError::invalid(format!(
            "cannot transition tenant from {from} to {to}"
        )))
    }
}
