use std::sync::Arc;

use learnhub_events::{OutboxPublisher, PgOutboxStore, StatusReporter};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: learnhub_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Outbox publisher handed to business handlers.
    pub publisher: OutboxPublisher<PgOutboxStore>,
    /// Read-only view of the notification worker for health checks.
    pub notifications: StatusReporter,
}
