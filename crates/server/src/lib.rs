//! # strata-server - Multi-tenant HTTP API
//!
//! This crate wires the Strata tenancy layer into an Axum application.
//! Every non-exempt request is resolved to an active tenant before it
//! reaches a handler, and the handler runs inside a task-local tenant
//! scope that binds database checkouts to the tenant's schema.
//!
//! ## Request flow
//!
//! 1. The [`resolver::SlugResolver`] extracts a candidate slug from the
//!    bearer token claim, the `X-Tenant-ID` header, or the Host
//!    subdomain, in that order.
//! 2. The [`middleware::tenant_middleware`] guard looks the slug up in
//!    the registry and rejects missing or non-active tenants.
//! 3. The handler runs inside `strata_tenancy::context::scope`; pool
//!    checkouts anywhere below are bound to the tenant schema.
//! 4. The response carries the serving tenant in `X-Tenant-Slug`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_server::{ServerConfig, create_app};
//! use strata_tenancy::{PgConfig, TenantPool, TenantRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env();
//!     let pool = TenantPool::new(PgConfig::from_env())?;
//!     let registry = TenantRegistry::new(pool.clone());
//!     registry.init().await?;
//!
//!     let app = create_app(Arc::new(registry), config.clone());
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Endpoints
//!
//! | Operation | HTTP Method | URL Pattern | Tenant scope |
//! |-----------|-------------|-------------|--------------|
//! | health | GET | `/health`, `/healthz` | exempt |
//! | whoami | GET | `/whoami` | required |
//! | create tenant | POST | `/platform/tenants` | exempt (admin) |
//! | list tenants | GET | `/platform/tenants` | exempt (admin) |
//! | get tenant | GET | `/platform/tenants/{slug}` | exempt (admin) |
//! | update tenant | PATCH | `/platform/tenants/{slug}` | exempt (admin) |
//! | suspend | POST | `/platform/tenants/{slug}/suspend` | exempt (admin) |
//! | activate | POST | `/platform/tenants/{slug}/activate` | exempt (admin) |
//! | deprovision | DELETE | `/platform/tenants/{slug}` | exempt (admin) |

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use strata_tenancy::TenantService;
use strata_tenancy::store::TenantStore;

pub mod claims;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod resolver;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::{AdminState, AppState};

/// Creates the Axum application with tenant-scoped routes only.
pub fn create_app<S: TenantStore>(store: Arc<S>, config: ServerConfig) -> Router {
    let state = AppState::new(store, config.clone());
    apply_layers(routes::create_routes(state), &config)
}

/// Creates the Axum application with tenant-scoped routes and the
/// platform administration surface.
pub fn create_app_with_admin<S: TenantStore>(
    store: Arc<S>,
    service: TenantService,
    config: ServerConfig,
) -> Router {
    let state = AppState::new(store, config.clone());
    let admin = AdminState::new(service);

    let router = routes::create_routes(state).merge(routes::create_admin_routes(admin));
    apply_layers(router, &config)
}

/// Applies the shared middleware stack: tracing, timeout, and CORS.
fn apply_layers(router: Router, config: &ServerConfig) -> Router {
    info!("Creating Strata API server");

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(config.request_timeout),
        ));

    let router = if config.enable_cors {
        router.layer(build_cors_layer(config))
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "strata_server={level},strata_tenancy={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
