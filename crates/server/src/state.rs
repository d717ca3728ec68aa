//! Shared application state.

use std::sync::Arc;

use strata_tenancy::TenantService;
use strata_tenancy::store::TenantStore;

use crate::config::ServerConfig;
use crate::resolver::SlugResolver;

/// Shared state for tenant-scoped routes.
///
/// # Type Parameters
///
/// * `S` - The tenant lookup backend (must implement [`TenantStore`])
pub struct AppState<S> {
    /// Tenant lookup backend.
    store: Arc<S>,

    /// Server configuration.
    config: Arc<ServerConfig>,

    /// Tenant slug resolver.
    resolver: Arc<SlugResolver>,
}

// Manual Clone since S is behind an Arc and need not be Clone itself.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<S: TenantStore> AppState<S> {
    /// Creates a new AppState with the given store and configuration.
    pub fn new(store: Arc<S>, config: ServerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            resolver: Arc::new(SlugResolver::new()),
        }
    }

    /// Returns a reference to the tenant store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns a reference to the slug resolver.
    pub fn resolver(&self) -> &SlugResolver {
        &self.resolver
    }
}

/// Shared state for the platform administration routes.
#[derive(Clone)]
pub struct AdminState {
    service: Arc<TenantService>,
}

impl AdminState {
    pub fn new(service: TenantService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Returns a reference to the lifecycle service.
    pub fn service(&self) -> &TenantService {
        &self.service
    }
}
