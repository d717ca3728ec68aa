//! Strata Tenancy Layer
//!
//! This crate implements schema-per-tenant isolation on a single
//! PostgreSQL database. Every tenant owns one schema; shared state
//! (the tenant registry itself) lives in `public`. Isolation is
//! enforced at connection checkout: the pool rebinds `search_path` on
//! every `get()`, driven by a task-local tenant context.
//!
//! # Architecture
//!
//! - [`ident`] - Slug and schema name validation; the [`ident::SchemaName`]
//!   newtype is the only value ever interpolated into DDL
//! - [`model`] - Tenant registry rows and the lifecycle status machine
//! - [`context`] - Task-local tenant binding with scoped teardown
//! - [`pool`] - deadpool-backed pool with checkout-time schema binding
//! - [`registry`] - Durable tenant registry in `public.tenants`
//! - [`store`] - Read-side lookup trait, with an in-memory test store
//! - [`migrate`] - Per-schema migration ledger and runner
//! - [`lifecycle`] - Provisioning, suspension, and deprovisioning
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use strata_tenancy::lifecycle::{NoopBackup, TenantService};
//! use strata_tenancy::migrate::{Migration, SqlMigrator};
//! use strata_tenancy::model::CreateTenant;
//! use strata_tenancy::pool::{PgConfig, TenantPool};
//! use strata_tenancy::registry::TenantRegistry;
//!
//! # async fn run() -> Result<(), strata_tenancy::error::TenantError> {
//! let pool = TenantPool::new(PgConfig::from_env())?;
//! let registry = TenantRegistry::new(pool.clone());
//! registry.init().await?;
//!
//! let migrator = SqlMigrator::new(vec![Migration::new(
//!     "0001_users",
//!     "CREATE TABLE users (id BIGSERIAL PRIMARY KEY, email TEXT NOT NULL)",
//! )]);
//! let service = TenantService::new(
//!     registry,
//!     pool,
//!     Arc::new(migrator),
//!     Arc::new(NoopBackup),
//! );
//!
//! let tenant = service.create(CreateTenant::new("acme", "Acme Corp")).await?;
//! assert_eq!(tenant.schema_name, "tenant_acme");
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod ident;
pub mod lifecycle;
pub mod migrate;
pub mod model;
pub mod pool;
pub mod registry;
pub mod store;

pub use context::TenantBinding;
pub use error::{TenancyResult, TenantError};
pub use ident::SchemaName;
pub use lifecycle::{DeprovisionOptions, TenantService};
pub use model::{CreateTenant, Tenant, TenantPatch, TenantStatus};
pub use pool::{PgConfig, TenantPool};
pub use registry::TenantRegistry;
pub use store::{MemoryTenantStore, TenantStore};
