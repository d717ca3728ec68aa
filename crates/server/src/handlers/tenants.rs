//! Platform tenant administration.
//!
//! These routes are exempt from tenant resolution; they operate on the
//! registry itself. In production they sit behind the platform
//! operator auth layer at the gateway.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use strata_tenancy::lifecycle::DeprovisionOptions;
use strata_tenancy::model::{CreateTenant, Tenant, TenantPatch, TenantStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AdminState;

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Filter by lifecycle status.
    pub status: Option<TenantStatus>,
    /// Page size, capped at 1000.
    pub limit: Option<i64>,
    /// Offset into the slug-ordered result set.
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeprovisionParams {
    /// Drop the tenant schema; destructive, so defaults to false.
    #[serde(default)]
    pub delete_schema: bool,
    /// Run the backup hook before the drop; defaults to true.
    #[serde(default = "default_true")]
    pub backup_first: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct SuspendRequest {
    /// Why the tenant is being suspended; stored on the tenant config.
    pub reason: Option<String>,
}

/// `POST /platform/tenants`
pub async fn create_tenant(
    State(state): State<AdminState>,
    Json(req): Json<CreateTenant>,
) -> ApiResult<(StatusCode, Json<Tenant>)> {
    let tenant = state.service().create(req).await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

/// `GET /platform/tenants`
pub async fn list_tenants(
    State(state): State<AdminState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Tenant>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 1000);
    let offset = params.offset.unwrap_or(0).max(0);
    let tenants = state.service().list(params.status, limit, offset).await?;
    Ok(Json(tenants))
}

/// `GET /platform/tenants/{slug}`
pub async fn get_tenant(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Tenant>> {
    let tenant = state.service().get(&slug).await.map_err(ApiError::admin)?;
    Ok(Json(tenant))
}

/// `PATCH /platform/tenants/{slug}`
pub async fn update_tenant(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
    Json(patch): Json<TenantPatch>,
) -> ApiResult<Json<Tenant>> {
    let tenant = state
        .service()
        .update(&slug, patch)
        .await
        .map_err(ApiError::admin)?;
    Ok(Json(tenant))
}

/// `POST /platform/tenants/{slug}/suspend`
pub async fn suspend_tenant(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
    body: Option<Json<SuspendRequest>>,
) -> ApiResult<Json<Tenant>> {
    let reason = body.and_then(|Json(req)| req.reason);
    let tenant = state
        .service()
        .suspend(&slug, reason)
        .await
        .map_err(ApiError::admin)?;
    Ok(Json(tenant))
}

/// `POST /platform/tenants/{slug}/activate`
pub async fn activate_tenant(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Tenant>> {
    let tenant = state
        .service()
        .activate(&slug)
        .await
        .map_err(ApiError::admin)?;
    Ok(Json(tenant))
}

/// `DELETE /platform/tenants/{slug}`
///
/// Deprovisions the tenant, leaving the registry row in the terminal
/// inactive state. The schema is dropped only when
/// `?delete_schema=true` is passed.
pub async fn deprovision_tenant(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
    Query(params): Query<DeprovisionParams>,
) -> ApiResult<Json<Tenant>> {
    let opts = DeprovisionOptions {
        delete_schema: params.delete_schema,
        backup_first: params.backup_first,
    };
    let tenant = state
        .service()
        .deprovision(&slug, opts)
        .await
        .map_err(ApiError::admin)?;
    Ok(Json(tenant))
}
