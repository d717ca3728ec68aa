//! Tenant introspection for authenticated callers.

use axum::Json;
use serde::Serialize;
use strata_tenancy::context;
use strata_tenancy::error::TenantError;

use crate::error::{ApiError, ApiResult};

/// Tenant identity of the current request.
#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub slug: String,
    pub schema: String,
}

/// `GET /whoami`.
///
/// Reports which tenant the request was resolved to. Runs behind the
/// tenant guard, so the context is always populated here.
pub async fn whoami() -> ApiResult<Json<WhoAmI>> {
    let binding = context::current()
        .ok_or_else(|| ApiError::from(TenantError::not_found("no tenant context")))?;
    Ok(Json(WhoAmI {
        slug: binding.slug().to_string(),
        schema: binding.schema().as_str().to_string(),
    }))
}
