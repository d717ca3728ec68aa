//! Tenant guard middleware.
//!
//! Every non-exempt request must resolve to an active tenant before it
//! reaches a handler. The handler and everything it awaits run inside a
//! task-local tenant scope, so database checkouts made anywhere below
//! are bound to the tenant's schema, and the scope unwinds with the
//! request no matter how it ends.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use strata_tenancy::context::{self, TenantBinding};
use strata_tenancy::error::TenantError;
use strata_tenancy::ident::SchemaName;
use strata_tenancy::model::TenantStatus;
use strata_tenancy::store::TenantStore;

use crate::error::ApiError;
use crate::state::AppState;

/// Header name for tenant identification on requests.
pub static X_TENANT_ID: HeaderName = HeaderName::from_static("x-tenant-id");

/// Response header echoing the tenant a request was served under.
pub static X_TENANT_SLUG: HeaderName = HeaderName::from_static("x-tenant-slug");

/// Paths served without a tenant context.
///
/// Prefix-matched on path segments, so `/platform/tenants/acme` is
/// exempt via `/platform/tenants`.
const EXEMPT_PATHS: &[&str] = &[
    "/health",
    "/healthz",
    "/docs",
    "/redoc",
    "/openapi.json",
    "/platform/tenants",
    "/auth/login",
    "/auth/callback",
];

/// Returns `true` if the path is served without tenant resolution.
pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS
        .iter()
        .any(|p| path == *p || path.starts_with(&format!("{p}/")))
}

/// Middleware enforcing tenant resolution on non-exempt routes.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn tenant_middleware<S: TenantStore>(
    State(state): State<AppState<S>>,
    request: Request,
    next: Next,
) -> Response {
    // CORS preflights carry no credentials or tenant headers.
    if request.method() == Method::OPTIONS || is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();

    let Some(resolved) = state.resolver().resolve(&parts) else {
        return ApiError::from(TenantError::not_found("no tenant identifier in request"))
            .into_response();
    };

    // Registry lookup runs outside any tenant scope; the registry lives
    // in public.
    let tenant = match state.store().resolve(&resolved.slug).await {
        Ok(tenant) => tenant,
        Err(e) => return ApiError::from(e).into_response(),
    };

    if tenant.status != TenantStatus::Active {
        tracing::debug!(
            slug = %tenant.slug,
            status = %tenant.status,
            "rejecting request for non-active tenant"
        );
        return ApiError::from(TenantError::inactive(&tenant.slug)).into_response();
    }

    let schema = match SchemaName::parse(&tenant.schema_name) {
        Ok(schema) => schema,
        Err(e) => return ApiError::from(e).into_response(),
    };

    tracing::debug!(
        slug = %tenant.slug,
        schema = %schema,
        source = %resolved.source,
        "resolved tenant"
    );

    let slug = tenant.slug.clone();
    let binding = TenantBinding::new(schema, &slug);
    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(tenant);

    let mut response = context::scope(binding, next.run(request)).await;

    if let Ok(value) = HeaderValue::from_str(&slug) {
        response.headers_mut().insert(X_TENANT_SLUG.clone(), value);
    }
    response
}
