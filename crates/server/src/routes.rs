//! Route configuration.

use axum::{
    Router, middleware,
    routing::{get, post},
};

use strata_tenancy::store::TenantStore;

use crate::handlers::{health, tenants, whoami};
use crate::middleware::tenant_middleware;
use crate::state::{AdminState, AppState};

/// Builds the tenant-scoped application routes.
///
/// The tenant guard wraps every route here; health probes pass through
/// via the exempt list.
pub fn create_routes<S: TenantStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/healthz", get(health::health))
        .route("/whoami", get(whoami::whoami))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            tenant_middleware::<S>,
        ))
        .with_state(state)
}

/// Builds the platform administration routes.
pub fn create_admin_routes(state: AdminState) -> Router {
    Router::new()
        .route(
            "/platform/tenants",
            get(tenants::list_tenants).post(tenants::create_tenant),
        )
        .route(
            "/platform/tenants/{slug}",
            get(tenants::get_tenant)
                .patch(tenants::update_tenant)
                .delete(tenants::deprovision_tenant),
        )
        .route(
            "/platform/tenants/{slug}/suspend",
            post(tenants::suspend_tenant),
        )
        .route(
            "/platform/tenants/{slug}/activate",
            post(tenants::activate_tenant),
        )
        .with_state(state)
}
