//! Liveness endpoint.

use axum::Json;
use serde_json::{Value, json};

/// `GET /health` and `GET /healthz`.
///
/// Exempt from tenant resolution; load balancers probe this without
/// tenant headers.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
