//! Per-schema migrations.
//!
//! Each tenant schema carries its own `schema_migrations` ledger, so a
//! schema created today and one created last year both converge on the
//! same head revision. Migrations run on a dedicated connection whose
//! `search_path` is pinned to the target schema alone, keeping all DDL
//! inside that schema.

use async_trait::async_trait;
use std::collections::HashSet;
use tokio_postgres::Client;

use crate::error::TenancyResult;
use crate::ident::SchemaName;

/// A single named migration step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Unique, stable name; the ledger key.
    pub name: &'static str,
    /// The SQL to apply, possibly multiple statements.
    pub sql: &'static str,
}

impl Migration {
    pub const fn new(name: &'static str, sql: &'static str) -> Self {
        Self { name, sql }
    }
}

/// Applies migrations to a tenant schema.
#[async_trait]
pub trait SchemaMigrator: Send + Sync + 'static {
    /// Brings `schema` to the head revision, returning how many
    /// migrations were applied.
    async fn migrate(&self, client: &mut Client, schema: &SchemaName) -> TenancyResult<usize>;
}

/// Migrator that applies an ordered list of SQL migrations.
///
/// Already-applied migrations are skipped by ledger name; each pending
/// migration runs in its own transaction together with its ledger
/// insert, so a failure leaves earlier steps applied and the failing
/// one fully rolled back.
#[derive(Debug, Clone, Default)]
pub struct SqlMigrator {
    migrations: Vec<Migration>,
}

impl SqlMigrator {
    pub fn new(migrations: Vec<Migration>) -> Self {
        Self { migrations }
    }

    /// Returns the migrations not yet recorded in `applied`, in order.
    fn pending(&self, applied: &HashSet<String>) -> Vec<&Migration> {
        self.migrations
            .iter()
            .filter(|m| !applied.contains(m.name))
            .collect()
    }
}

#[async_trait]
impl SchemaMigrator for SqlMigrator {
    async fn migrate(&self, client: &mut Client, schema: &SchemaName) -> TenancyResult<usize> {
        client
            .batch_execute(&format!("SET search_path TO {}", schema.quoted()))
            .await?;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS schema_migrations (
                     name TEXT PRIMARY KEY,
                     applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
                 )",
            )
            .await?;

        let applied: HashSet<String> = client
            .query("SELECT name FROM schema_migrations", &[])
            .await?
            .iter()
            .map(|row| row.get(0))
            .collect();

        let pending = self.pending(&applied);
        let count = pending.len();

        for migration in pending {
            let tx = client.transaction().await?;
            tx.batch_execute(migration.sql).await?;
            tx.execute(
                "INSERT INTO schema_migrations (name) VALUES ($1)",
                &[&migration.name],
            )
            .await?;
            tx.commit().await?;
            tracing::info!(schema = %schema, migration = migration.name, "applied migration");
        }

        Ok(count)
    }
}
