//! Read-side tenant lookup used during request resolution.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{TenancyResult, TenantError};
use crate::ident::validate_slug;
use crate::model::Tenant;

/// Lookup interface the request path depends on.
///
/// The production implementation is [`crate::registry::TenantRegistry`];
/// [`MemoryTenantStore`] backs HTTP-level tests that run without a
/// database.
#[async_trait]
pub trait TenantStore: Send + Sync + 'static {
    /// Finds a tenant by slug, regardless of status.
    async fn find_by_slug(&self, slug: &str) -> TenancyResult<Option<Tenant>>;

    /// Finds a tenant by slug and rejects identifiers that fail slug
    /// validation before touching storage.
    async fn resolve(&self, slug: &str) -> TenancyResult<Tenant> {
        validate_slug(slug)?;
        self.find_by_slug(slug)
            .await?
            .ok_or_else(|| TenantError::not_found(slug))
    }
}

/// In-memory store keyed by slug.
#[derive(Debug, Clone, Default)]
pub struct MemoryTenantStore {
    tenants: Arc<RwLock<HashMap<String, Tenant>>>,
}

impl MemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a tenant.
    pub fn insert(&self, tenant: Tenant) {
        self.tenants.write().insert(tenant.slug.clone(), tenant);
    }

    pub fn remove(&self, slug: &str) -> Option<Tenant> {
        self.tenants.write().remove(slug)
    }

    pub fn len(&self) -> usize {
        self.tenants.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.read().is_empty()
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn find_by_slug(&self, slug: &str) -> TenancyResult<Option<Tenant>> {
        Ok(self.tenants.read().get(slug).cloned())
    }
}
