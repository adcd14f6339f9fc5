#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use learnhub_api::config::ServerConfig;
use learnhub_api::router::build_app_router;
use learnhub_api::state::AppState;
use learnhub_events::{OutboxPublisher, PgOutboxStore, StatusReporter};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
    }
}

/// Build the full application router with notification delivery disabled.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, StatusReporter::disabled())
}

/// Build the full application router with the given notification reporter.
///
/// Goes through [`build_app_router`] so tests exercise the production
/// middleware stack.
pub fn build_test_app_with(pool: PgPool, notifications: StatusReporter) -> Router {
    let config = test_config();
    let publisher = OutboxPublisher::new(PgOutboxStore::new(pool.clone()), notifications.is_enabled());

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        publisher,
        notifications,
    };

    build_app_router(state, &config)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
