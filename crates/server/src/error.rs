//! Error types for the Strata API.
//!
//! Tenancy errors map to stable machine-readable error codes in a JSON
//! body of the shape `{"error", "message", "details"}`:
//!
//! | Tenancy Error | HTTP Status | Error Code |
//! |---------------|-------------|------------|
//! | NotFound | 400 | tenant_not_found |
//! | Inactive | 403 | tenant_inactive |
//! | Invalid | 400 | tenant_error |
//! | ProvisionFailed | 400 | tenant_error |
//! | DeprovisionFailed | 400 | tenant_error |
//! | Database / Pool | 500 | internal_error |
//!
//! A missing tenant resolves to 400 rather than 404 on purpose: the
//! request was malformed from this API's point of view. The platform
//! admin routes are the exception — there the tenant is the resource
//! being addressed, so a missing one is a plain 404 (see
//! [`ApiError::admin`]).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use strata_tenancy::TenantError;

/// The primary error type for API operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Tenancy layer error; see the module table for the mapping.
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Addressed resource does not exist (HTTP 404).
    #[error("{message}")]
    NotFound { message: String },
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
        }
    }

    /// Maps a tenancy error for the platform admin surface, where the
    /// tenant itself is the addressed resource: a missing tenant is a
    /// 404 rather than the middleware's 400.
    pub fn admin(err: TenantError) -> Self {
        match err {
            TenantError::NotFound { identifier } => {
                ApiError::not_found(format!("tenant not found: {identifier}"))
            }
            other => ApiError::Tenant(other),
        }
    }

    /// Returns the HTTP status and error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Tenant(err) => match err {
                TenantError::NotFound { .. } => (StatusCode::BAD_REQUEST, "tenant_not_found"),
                TenantError::Inactive { .. } => (StatusCode::FORBIDDEN, "tenant_inactive"),
                TenantError::Invalid { .. }
                | TenantError::ProvisionFailed { .. }
                | TenantError::DeprovisionFailed { .. } => {
                    (StatusCode::BAD_REQUEST, "tenant_error")
                }
                TenantError::Database(_)
                | TenantError::Pool(_)
                | TenantError::PoolBuild(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
            },
            ApiError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Internal errors keep their detail in the logs, not the body.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {self}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: code.to_string(),
            message,
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

/// Convenience result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
