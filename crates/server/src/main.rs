//! Strata API Server
//!
//! Multi-tenant HTTP API with schema-per-tenant PostgreSQL isolation.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use strata_server::{ServerConfig, create_app_with_admin, init_logging};
use strata_tenancy::lifecycle::{NoopBackup, TenantService};
use strata_tenancy::migrate::{Migration, SqlMigrator};
use strata_tenancy::pool::{PgConfig, TenantPool};
use strata_tenancy::registry::TenantRegistry;

/// Migrations applied to every tenant schema, in order.
const TENANT_MIGRATIONS: &[Migration] = &[
    Migration::new(
        "0001_create_users",
        include_str!("../migrations/0001_create_users.sql"),
    ),
    Migration::new(
        "0002_create_agents",
        include_str!("../migrations/0002_create_agents.sql"),
    ),
];

fn create_pool(config: &ServerConfig) -> anyhow::Result<TenantPool> {
    let pg = match &config.database_url {
        Some(url) => PgConfig::from_connection_string(url),
        None => PgConfig::from_env(),
    };
    info!(host = %pg.host, dbname = %pg.dbname, "Connecting to PostgreSQL");
    Ok(TenantPool::new(pg)?)
}

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    info!(
        port = config.port,
        host = %config.host,
        "Starting Strata API Server"
    );

    let pool = create_pool(&config)?;
    let registry = TenantRegistry::new(pool.clone());
    registry.init().await?;

    let service = TenantService::new(
        registry.clone(),
        pool,
        Arc::new(SqlMigrator::new(TENANT_MIGRATIONS.to_vec())),
        Arc::new(NoopBackup),
    );

    let app = create_app_with_admin(Arc::new(registry), service, config.clone());
    serve(app, &config).await
}
