//! Tenant lifecycle integration tests.
//!
//! These tests run against a real PostgreSQL instance via testcontainers
//! and require Docker.
//!
//! Run with: `cargo test -p strata-tenancy -- pg_integration`
//!
//! Skip if no Docker: `cargo test -p strata-tenancy -- --skip pg_integration`

use std::sync::Arc;

use strata_tenancy::context::{self, TenantBinding};
use strata_tenancy::error::TenantError;
use strata_tenancy::ident::SchemaName;
use strata_tenancy::lifecycle::{
    DeprovisionOptions, NoopBackup, TenantService, SUSPENSION_REASON_KEY,
};
use strata_tenancy::migrate::{Migration, SqlMigrator};
use strata_tenancy::model::{CreateTenant, TenantStatus};
use strata_tenancy::pool::{PgConfig, TenantPool};
use strata_tenancy::registry::TenantRegistry;

use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

const MIGRATIONS: &[Migration] = &[
    Migration::new(
        "0001_create_users",
        "CREATE TABLE users (
             id BIGSERIAL PRIMARY KEY,
             email TEXT NOT NULL UNIQUE,
             display_name TEXT
         )",
    ),
    Migration::new(
        "0002_create_agents",
        "CREATE TABLE agents (
             id BIGSERIAL PRIMARY KEY,
             name TEXT NOT NULL,
             owner_id BIGINT REFERENCES users(id)
         )",
    ),
];

/// Shared PostgreSQL container reused across all tests in this binary.
struct SharedPg {
    host: String,
    port: u16,
    /// Kept alive for the duration of the test binary; dropped at process exit.
    _container: testcontainers::ContainerAsync<Postgres>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn shared_pg() -> &'static SharedPg {
    SHARED_PG
        .get_or_init(|| async {
            let run_id = std::env::var("GITHUB_RUN_ID").unwrap_or_default();
            let container = Postgres::default()
                .with_label("github.run_id", &run_id)
                .start()
                .await
                .expect("Failed to start PostgreSQL container");

            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("Failed to get host port");

            let host = container
                .get_host()
                .await
                .expect("Failed to get host")
                .to_string();

            SharedPg {
                host,
                port,
                _container: container,
            }
        })
        .await
}

async fn create_pool() -> TenantPool {
    let pg = shared_pg().await;
    let config = PgConfig {
        host: pg.host.clone(),
        port: pg.port,
        dbname: "postgres".to_string(),
        user: "postgres".to_string(),
        password: Some("postgres".to_string()),
        max_connections: 5,
        ..Default::default()
    };
    TenantPool::new(config).expect("Failed to create pool")
}

/// Builds a service with the standard test migrations. The registry
/// table is created idempotently on the shared database.
async fn create_service() -> (TenantService, TenantPool) {
    let pool = create_pool().await;
    let registry = TenantRegistry::new(pool.clone());
    registry.init().await.expect("Failed to init registry");

    let service = TenantService::new(
        registry,
        pool.clone(),
        Arc::new(SqlMigrator::new(MIGRATIONS.to_vec())),
        Arc::new(NoopBackup),
    );
    (service, pool)
}

/// Unique slug per test so tests sharing the database never collide.
/// Hyphen-free so the default schema name derives cleanly.
fn unique_slug(prefix: &str) -> String {
    format!("{}{}", prefix, uuid::Uuid::new_v4().simple())
}

async fn schema_exists(pool: &TenantPool, schema: &str) -> bool {
    let client = pool.connect().await.expect("Failed to connect");
    let row = client
        .query_one(
            "SELECT EXISTS(SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
            &[&schema],
        )
        .await
        .expect("Failed to query schemata");
    row.get(0)
}

// ============================================================================
// Provisioning
// ============================================================================

#[tokio::test]
async fn pg_integration_provision_tenant() {
    let (service, pool) = create_service().await;
    let slug = unique_slug("acme");

    let tenant = service
        .create(CreateTenant::new(&slug, "Acme Corp"))
        .await
        .expect("Failed to provision tenant");

    assert_eq!(tenant.status, TenantStatus::Active);
    assert_eq!(tenant.schema_name, format!("tenant_{slug}"));
    assert!(schema_exists(&pool, &tenant.schema_name).await);

    // Migrations ran to head inside the new schema.
    let client = pool.connect().await.unwrap();
    let sql = format!(
        "SELECT count(*) FROM \"{}\".schema_migrations",
        tenant.schema_name
    );
    let row = client.query_one(sql.as_str(), &[]).await.unwrap();
    let applied: i64 = row.get(0);
    assert_eq!(applied, MIGRATIONS.len() as i64);
}

#[tokio::test]
async fn pg_integration_reserved_slug_rejected_without_side_effects() {
    let (service, pool) = create_service().await;

    let err = service
        .create(CreateTenant::new("admin", "Admin"))
        .await
        .unwrap_err();
    assert!(err.is_invalid(), "expected Invalid, got {err}");

    assert!(service.registry().find_by_slug("admin").await.unwrap().is_none());
    assert!(!schema_exists(&pool, "tenant_admin").await);
}

#[tokio::test]
async fn pg_integration_hyphen_slug_requires_explicit_schema() {
    let (service, pool) = create_service().await;
    let slug = format!("{}-corp", unique_slug("hyph"));

    // "tenant_" + slug is not a legal schema name, so the default is
    // rejected rather than rewritten.
    let err = service
        .create(CreateTenant::new(&slug, "Hyphenated"))
        .await
        .unwrap_err();
    assert!(err.is_invalid(), "expected Invalid, got {err}");
    assert!(service.registry().find_by_slug(&slug).await.unwrap().is_none());

    // An explicit schema name makes the same slug provisionable.
    let schema = format!("tenant_{}", slug.replace('-', "_"));
    let mut req = CreateTenant::new(&slug, "Hyphenated");
    req.schema_name = Some(schema.clone());
    let tenant = service.create(req).await.unwrap();
    assert_eq!(tenant.schema_name, schema);
    assert!(schema_exists(&pool, &schema).await);
}

#[tokio::test]
async fn pg_integration_duplicate_create_is_invalid() {
    let (service, _pool) = create_service().await;
    let slug = unique_slug("dup");

    service
        .create(CreateTenant::new(&slug, "First"))
        .await
        .expect("first create failed");

    let err = service
        .create(CreateTenant::new(&slug, "Second"))
        .await
        .unwrap_err();
    assert!(err.is_invalid(), "expected Invalid, got {err}");
}

#[tokio::test]
async fn pg_integration_concurrent_create_single_winner() {
    let (service, pool) = create_service().await;
    let slug = unique_slug("race");

    let (a, b) = tokio::join!(
        service.create(CreateTenant::new(&slug, "Racer A")),
        service.create(CreateTenant::new(&slug, "Racer B")),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one concurrent create should win");

    // The loser surfaces as Invalid, not as a transport error.
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(loser.is_invalid(), "expected Invalid, got {loser}");

    let tenant = service.get(&slug).await.unwrap();
    assert_eq!(tenant.status, TenantStatus::Active);

    // Exactly one physical schema carries the tenant's name.
    let client = pool.connect().await.unwrap();
    let row = client
        .query_one(
            "SELECT count(*) FROM information_schema.schemata WHERE schema_name = $1",
            &[&tenant.schema_name],
        )
        .await
        .unwrap();
    assert_eq!(row.get::<_, i64>(0), 1);
}

#[tokio::test]
async fn pg_integration_failed_migration_leaves_provisioning_row() {
    let pool = create_pool().await;
    let registry = TenantRegistry::new(pool.clone());
    registry.init().await.unwrap();

    let service = TenantService::new(
        registry.clone(),
        pool.clone(),
        Arc::new(SqlMigrator::new(vec![Migration::new(
            "0001_broken",
            "CREATE TABLE users (id THIS_IS_NOT_A_TYPE)",
        )])),
        Arc::new(NoopBackup),
    );

    let slug = unique_slug("broken");
    let err = service
        .create(CreateTenant::new(&slug, "Broken"))
        .await
        .unwrap_err();
    assert!(matches!(err, TenantError::ProvisionFailed { .. }));

    // The row stays visible in provisioning; the half-built schema is gone.
    let tenant = registry.find_by_slug(&slug).await.unwrap().unwrap();
    assert_eq!(tenant.status, TenantStatus::Provisioning);
    assert!(!schema_exists(&pool, &tenant.schema_name).await);

    // The stuck row cannot be activated by hand: its schema does not
    // exist, so an active tenant here would resolve against public.
    let err = service.activate(&slug).await.unwrap_err();
    assert!(err.is_invalid(), "expected Invalid, got {err}");
    let tenant = registry.find_by_slug(&slug).await.unwrap().unwrap();
    assert_eq!(tenant.status, TenantStatus::Provisioning);
}

// ============================================================================
// Connection binding
// ============================================================================

#[tokio::test]
async fn pg_integration_checkout_binds_current_tenant() {
    let (service, pool) = create_service().await;
    let slug_a = unique_slug("binda");
    let slug_b = unique_slug("bindb");

    let tenant_a = service.create(CreateTenant::new(&slug_a, "A")).await.unwrap();
    let tenant_b = service.create(CreateTenant::new(&slug_b, "B")).await.unwrap();

    let schema_a = SchemaName::parse(&tenant_a.schema_name).unwrap();
    let schema_b = SchemaName::parse(&tenant_b.schema_name).unwrap();

    // Unqualified inserts land in whichever schema the context binds.
    context::scope(TenantBinding::new(schema_a.clone(), &slug_a), async {
        let client = pool.get().await.unwrap();
        client
            .execute("INSERT INTO users (email) VALUES ($1)", &[&"a@a.example"])
            .await
            .unwrap();
    })
    .await;

    context::scope(TenantBinding::new(schema_b.clone(), &slug_b), async {
        let client = pool.get().await.unwrap();
        client
            .execute("INSERT INTO users (email) VALUES ($1)", &[&"b1@b.example"])
            .await
            .unwrap();
        client
            .execute("INSERT INTO users (email) VALUES ($1)", &[&"b2@b.example"])
            .await
            .unwrap();
    })
    .await;

    let count = |schema: SchemaName| {
        let pool = pool.clone();
        async move {
            let client = pool.connect().await.unwrap();
            let sql = format!("SELECT count(*) FROM {}.users", schema.quoted());
            let row = client.query_one(sql.as_str(), &[]).await.unwrap();
            row.get::<_, i64>(0)
        }
    };

    assert_eq!(count(schema_a).await, 1);
    assert_eq!(count(schema_b).await, 2);
}

#[tokio::test]
async fn pg_integration_checkout_without_context_resets_to_public() {
    let (service, pool) = create_service().await;
    let slug = unique_slug("reset");
    let tenant = service.create(CreateTenant::new(&slug, "Reset")).await.unwrap();
    let schema = SchemaName::parse(&tenant.schema_name).unwrap();

    // Exercise the pool under a tenant binding so a reused connection
    // would otherwise still carry the tenant schema.
    context::scope(TenantBinding::new(schema, &slug), async {
        let client = pool.get().await.unwrap();
        client.simple_query("SELECT 1").await.unwrap();
    })
    .await;

    let client = pool.get().await.unwrap();
    let rows = client.query("SHOW search_path", &[]).await.unwrap();
    let path: String = rows[0].get(0);
    assert_eq!(path, "public");
}

// ============================================================================
// Lifecycle state machine
// ============================================================================

#[tokio::test]
async fn pg_integration_suspend_records_reason_and_activate_clears_it() {
    let (service, _pool) = create_service().await;
    let slug = unique_slug("susp");
    service.create(CreateTenant::new(&slug, "Susp")).await.unwrap();

    let tenant = service
        .suspend(&slug, Some("invoice overdue".to_string()))
        .await
        .unwrap();
    assert_eq!(tenant.status, TenantStatus::Suspended);
    assert!(tenant.suspended_at.is_some());
    assert_eq!(
        tenant.config.get(SUSPENSION_REASON_KEY).and_then(|v| v.as_str()),
        Some("invoice overdue")
    );

    let tenant = service.activate(&slug).await.unwrap();
    assert_eq!(tenant.status, TenantStatus::Active);
    assert!(tenant.suspended_at.is_none());
    assert!(!tenant.config.contains_key(SUSPENSION_REASON_KEY));
}

#[tokio::test]
async fn pg_integration_invalid_transitions_rejected() {
    let (service, _pool) = create_service().await;
    let slug = unique_slug("trans");
    service.create(CreateTenant::new(&slug, "Trans")).await.unwrap();

    // Active -> Active is not a transition.
    assert!(service.activate(&slug).await.unwrap_err().is_invalid());

    service.suspend(&slug, None).await.unwrap();
    // Suspended -> Suspended likewise.
    assert!(service.suspend(&slug, None).await.unwrap_err().is_invalid());
}

#[tokio::test]
async fn pg_integration_deprovision_drops_schema_and_keeps_row() {
    let (service, pool) = create_service().await;
    let slug = unique_slug("depr");
    let tenant = service.create(CreateTenant::new(&slug, "Depr")).await.unwrap();
    assert!(schema_exists(&pool, &tenant.schema_name).await);

    let opts = DeprovisionOptions {
        delete_schema: true,
        backup_first: true,
    };
    let tenant = service.deprovision(&slug, opts).await.unwrap();
    assert_eq!(tenant.status, TenantStatus::Inactive);
    assert!(!schema_exists(&pool, &tenant.schema_name).await);

    // The row survives as an audit record, but the tenant is done.
    assert!(service.suspend(&slug, None).await.unwrap_err().is_invalid());
    assert!(
        service
            .deprovision(&slug, opts)
            .await
            .unwrap_err()
            .is_invalid()
    );
}

#[tokio::test]
async fn pg_integration_deprovision_default_retains_schema() {
    let (service, pool) = create_service().await;
    let slug = unique_slug("keep");
    let tenant = service.create(CreateTenant::new(&slug, "Keep")).await.unwrap();
    assert!(schema_exists(&pool, &tenant.schema_name).await);

    // Dropping the schema is opt-in; the default only retires the row.
    let tenant = service
        .deprovision(&slug, DeprovisionOptions::default())
        .await
        .unwrap();
    assert_eq!(tenant.status, TenantStatus::Inactive);
    assert!(schema_exists(&pool, &tenant.schema_name).await);
}

#[tokio::test]
async fn pg_integration_metadata_update() {
    let (service, _pool) = create_service().await;
    let slug = unique_slug("meta");
    service.create(CreateTenant::new(&slug, "Before")).await.unwrap();

    let patch = strata_tenancy::model::TenantPatch {
        name: Some("After".to_string()),
        max_users: Some(25),
        ..Default::default()
    };
    let tenant = service.update(&slug, patch).await.unwrap();
    assert_eq!(tenant.name, "After");
    assert_eq!(tenant.max_users, Some(25));
    // Untouched fields survive the patch.
    assert_eq!(tenant.slug, slug);
}
