use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether a backing store is configured at all.
    pub db_configured: bool,
    /// Whether the database is reachable (always false when unconfigured).
    pub db_healthy: bool,
}

/// GET /health -- returns service and database health.
///
/// Fallback mode (no store configured) still reports `ok`: the service is
/// intentionally running on local-storage-only semantics.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (db_configured, db_healthy) = match &state.pool {
        Some(pool) => (true, srs_db::health_check(pool).await.is_ok()),
        None => (false, false),
    };

    let status = if db_configured && !db_healthy {
        "degraded"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_configured,
        db_healthy,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
