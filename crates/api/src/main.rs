use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use learnhub_api::config::ServerConfig;
use learnhub_api::router::build_app_router;
use learnhub_api::state::AppState;
use learnhub_events::{
    build_sink, NotificationConfig, OutboxPublisher, OutboxWorker, PgOutboxStore, StatusReporter,
    StatusSource,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "learnhub_api=debug,learnhub_events=debug,learnhub::notifications=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let notification_config =
        NotificationConfig::from_env().expect("Invalid notification configuration");
    tracing::info!(
        enabled = notification_config.enabled,
        sink = %notification_config.sink,
        poll_interval_ms = notification_config.poll_interval.as_millis() as u64,
        batch_size = notification_config.batch_size,
        "Loaded notification configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = learnhub_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    learnhub_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    learnhub_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Outbox ---
    let store = PgOutboxStore::new(pool.clone());
    let publisher = OutboxPublisher::new(store.clone(), notification_config.enabled);

    let worker = if notification_config.enabled {
        let sink = build_sink(&notification_config).expect("Invalid notification sink");
        let worker = Arc::new(OutboxWorker::new(store, sink, &notification_config));
        worker.start().await;
        tracing::info!(sink = %notification_config.sink, "Outbox worker started");
        Some(worker)
    } else {
        tracing::info!("Notification delivery disabled, outbox worker not started");
        None
    };

    let notifications = match &worker {
        Some(worker) => {
            let source: Arc<dyn StatusSource> = worker.clone();
            StatusReporter::new(true, Some(source))
        }
        None => StatusReporter::disabled(),
    };

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        publisher,
        notifications,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if let Some(worker) = worker {
        let timeout = Duration::from_secs(config.shutdown_timeout_secs);
        if tokio::time::timeout(timeout, worker.stop()).await.is_err() {
            tracing::warn!(
                timeout_secs = config.shutdown_timeout_secs,
                "Outbox worker did not stop in time, abandoning in-flight cycle"
            );
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
