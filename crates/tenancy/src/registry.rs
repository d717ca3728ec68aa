//! Durable tenant registry backed by the shared `public` schema.
//!
//! All statements qualify the table as `public.tenants` so they are
//! correct regardless of the `search_path` the checked-out connection
//! happens to carry.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio_postgres::Row;

use crate::error::{map_registry_error, TenancyResult, TenantError};
use crate::model::{Tenant, TenantPatch, TenantStatus};
use crate::pool::TenantPool;
use crate::store::TenantStore;

const CREATE_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS public.tenants (
    slug          TEXT PRIMARY KEY,
    schema_name   TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    description   TEXT,
    admin_email   TEXT,
    status        TEXT NOT NULL,
    config        JSONB NOT NULL DEFAULT '{}'::jsonb,
    max_users     INTEGER,
    created_at    TIMESTAMPTZ NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL,
    suspended_at  TIMESTAMPTZ
)";

const SELECT_COLUMNS: &str = "slug, schema_name, name, description, admin_email, \
     status, config, max_users, created_at, updated_at, suspended_at";

fn tenant_from_row(row: &Row) -> TenancyResult<Tenant> {
    let status: String = row.get("status");
    let config: Value = row.get("config");
    let config = match config {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    Ok(Tenant {
        slug: row.get("slug"),
        schema_name: row.get("schema_name"),
        name: row.get("name"),
        description: row.get("description"),
        admin_email: row.get("admin_email"),
        status: TenantStatus::parse(&status)?,
        config,
        max_users: row.get("max_users"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        suspended_at: row.get("suspended_at"),
    })
}

/// Registry of tenants stored in `public.tenants`.
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    pool: TenantPool,
}

impl TenantRegistry {
    pub fn new(pool: TenantPool) -> Self {
        Self { pool }
    }

    /// Creates the registry table if it does not exist.
    pub async fn init(&self) -> TenancyResult<()> {
        let client = self.pool.get().await?;
        client.execute(CREATE_TABLE_SQL, &[]).await?;
        Ok(())
    }

    /// Inserts a new registry row.
    ///
    /// The primary key on `slug` is the concurrency guard for tenant
    /// creation: a duplicate insert surfaces as [`TenantError::Invalid`].
    pub async fn insert(&self, tenant: &Tenant) -> TenancyResult<()> {
        let client = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO public.tenants ({SELECT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        client
            .execute(
                sql.as_str(),
                &[
                    &tenant.slug,
                    &tenant.schema_name,
                    &tenant.name,
                    &tenant.description,
                    &tenant.admin_email,
                    &tenant.status.as_str(),
                    &Value::Object(tenant.config.clone()),
                    &tenant.max_users,
                    &tenant.created_at,
                    &tenant.updated_at,
                    &tenant.suspended_at,
                ],
            )
            .await
            .map_err(map_registry_error)?;
        Ok(())
    }

    /// Looks up a tenant by slug.
    pub async fn find_by_slug(&self, slug: &str) -> TenancyResult<Option<Tenant>> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM public.tenants WHERE slug = $1");
        let row = client.query_opt(sql.as_str(), &[&slug]).await?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    /// Returns `true` if a row exists with the given slug or schema name.
    pub async fn exists(&self, slug: &str, schema_name: &str) -> TenancyResult<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM public.tenants WHERE slug = $1 OR schema_name = $2)",
                &[&slug, &schema_name],
            )
            .await?;
        Ok(row.get(0))
    }

    /// Lists tenants, optionally filtered by status, ordered by slug.
    ///
    /// `limit` and `offset` page through the ordered result set.
    pub async fn list(
        &self,
        status: Option<TenantStatus>,
        limit: i64,
        offset: i64,
    ) -> TenancyResult<Vec<Tenant>> {
        let client = self.pool.get().await?;
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM public.tenants \
                     WHERE status = $1 ORDER BY slug LIMIT $2 OFFSET $3"
                );
                client
                    .query(sql.as_str(), &[&status.as_str(), &limit, &offset])
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM public.tenants \
                     ORDER BY slug LIMIT $1 OFFSET $2"
                );
                client.query(sql.as_str(), &[&limit, &offset]).await?
            }
        };
        rows.iter().map(tenant_from_row).collect()
    }

    /// Updates mutable metadata fields; `None` patch fields are kept.
    pub async fn update(&self, slug: &str, patch: &TenantPatch) -> TenancyResult<Tenant> {
        let client = self.pool.get().await?;
        let config = patch.config.clone().map(Value::Object);
        let sql = format!(
            "UPDATE public.tenants SET \
               name = COALESCE($2, name), \
               description = COALESCE($3, description), \
               admin_email = COALESCE($4, admin_email), \
               config = COALESCE($5, config), \
               max_users = COALESCE($6, max_users), \
               updated_at = $7 \
             WHERE slug = $1 \
             RETURNING {SELECT_COLUMNS}"
        );
        let row = client
            .query_opt(
                sql.as_str(),
                &[
                    &slug,
                    &patch.name,
                    &patch.description,
                    &patch.admin_email,
                    &config,
                    &patch.max_users,
                    &Utc::now(),
                ],
            )
            .await?;
        match row {
            Some(row) => tenant_from_row(&row),
            None => Err(TenantError::not_found(slug)),
        }
    }

    /// Sets the lifecycle status, maintaining `suspended_at`.
    pub async fn set_status(&self, slug: &str, status: TenantStatus) -> TenancyResult<Tenant> {
        let client = self.pool.get().await?;
        let now = Utc::now();
        let suspended_at = (status == TenantStatus::Suspended).then_some(now);
        let sql = format!(
            "UPDATE public.tenants SET \
               status = $2, updated_at = $3, suspended_at = $4 \
             WHERE slug = $1 \
             RETURNING {SELECT_COLUMNS}"
        );
        let row = client
            .query_opt(sql.as_str(), &[&slug, &status.as_str(), &now, &suspended_at])
            .await?;
        match row {
            Some(row) => tenant_from_row(&row),
            None => Err(TenantError::not_found(slug)),
        }
    }

}

#[async_trait]
impl TenantStore for TenantRegistry {
    async fn find_by_slug(&self, slug: &str) -> TenancyResult<Option<Tenant>> {
        TenantRegistry::find_by_slug(self, slug).await
    }
}
