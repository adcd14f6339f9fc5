use axum::extract::State;
use axum::{routing::get, Json, Router};
use learnhub_events::NotificationStatus;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
}

/// GET /health -- returns service and database health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = learnhub_db::health_check(&state.pool).await.is_ok();

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    })
}

/// GET /health/notifications -- returns the delivery worker's status.
///
/// `{"enabled": false}` when delivery is off; otherwise `enabled`,
/// `interval_ms`, `last_run_at`, `pending_estimate` and `sink`.
async fn notification_health(State(state): State<AppState>) -> AppResult<Json<NotificationStatus>> {
    Ok(Json(state.notifications.report()?))
}

/// Mount health check routes at the root level.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/notifications", get(notification_health))
}
