use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use learnhub_events::StatusError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
/// Internal causes are logged and never returned to the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The notification status could not be computed.
    #[error("Notification status error: {0}")]
    NotificationStatus(#[from] StatusError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotificationStatus(err) => {
                tracing::error!(error = %err, "Failed to compute notification status");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Notification status unavailable",
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
