//! Delivery targets for outbox events.
//!
//! A [`NotificationSink`] renders one event per call. The worker picks one
//! sink at construction via [`build_sink`] and uses it for its whole life.
//! Sinks may see the same event more than once (a batch is redelivered in
//! full after any failure), so every implementation here is safe to repeat.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use learnhub_core::types::{DbId, Timestamp};
use learnhub_db::models::outbox_event::OutboxEvent;
use serde::Serialize;

use crate::config::{ConfigError, NotificationConfig, SinkKind};

pub mod console;
pub mod file;
pub mod webhook;

pub use console::ConsoleSink;
pub use file::FileSink;
pub use webhook::WebhookSink;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for sink delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Filesystem failure (permission denied, disk full, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The delivery record could not be encoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),

    /// Delivery did not finish within the per-event budget.
    #[error("Delivery timed out after {0:?}")]
    Timeout(std::time::Duration),
}

// ---------------------------------------------------------------------------
// NotificationSink
// ---------------------------------------------------------------------------

/// A delivery target for outbox events.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Identifier reported in worker status.
    fn kind(&self) -> SinkKind;

    /// Deliver one event. An error fails the whole batch.
    async fn deliver(&self, event: &OutboxEvent) -> Result<(), SinkError>;
}

/// Build the sink selected by `config`.
pub fn build_sink(config: &NotificationConfig) -> Result<Arc<dyn NotificationSink>, ConfigError> {
    let sink: Arc<dyn NotificationSink> = match config.sink {
        SinkKind::Console => Arc::new(ConsoleSink::new()),
        SinkKind::File => Arc::new(FileSink::new(config.file_path.clone())),
        SinkKind::Webhook => {
            let url = config
                .webhook_url
                .clone()
                .ok_or(ConfigError::Missing {
                    var: "NOTIFICATIONS_WEBHOOK_URL",
                    sink: SinkKind::Webhook,
                })?;
            Arc::new(WebhookSink::new(url))
        }
    };
    Ok(sink)
}

// ---------------------------------------------------------------------------
// DeliveryRecord
// ---------------------------------------------------------------------------

/// The structured form of one delivery, shared by the file and webhook sinks.
#[derive(Debug, Serialize)]
pub struct DeliveryRecord<'a> {
    pub event_id: DbId,
    pub topic: &'a str,
    pub payload: &'a serde_json::Value,
    pub created_at: Timestamp,
    pub delivered_at: Timestamp,
}

impl<'a> DeliveryRecord<'a> {
    pub fn from_event(event: &'a OutboxEvent) -> Self {
        Self {
            event_id: event.id,
            topic: &event.topic,
            payload: &event.payload,
            created_at: event.created_at,
            delivered_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn build_sink_follows_configuration() {
        let mut config = NotificationConfig::default();
        assert_eq!(build_sink(&config).unwrap().kind(), SinkKind::Console);

        config.sink = SinkKind::File;
        config.file_path = PathBuf::from("/tmp/learnhub-test.log");
        assert_eq!(build_sink(&config).unwrap().kind(), SinkKind::File);

        config.sink = SinkKind::Webhook;
        config.webhook_url = Some("http://127.0.0.1:9/hook".to_string());
        assert_eq!(build_sink(&config).unwrap().kind(), SinkKind::Webhook);
    }

    #[test]
    fn build_webhook_sink_without_url_fails() {
        let config = NotificationConfig {
            sink: SinkKind::Webhook,
            ..NotificationConfig::default()
        };
        assert_matches!(build_sink(&config).err(), Some(ConfigError::Missing { .. }));
    }

    #[test]
    fn delivery_record_carries_event_fields() {
        let event = OutboxEvent {
            id: 7,
            topic: "enrollment.created".to_string(),
            payload: json!({"userId": 456}),
            created_at: Utc::now(),
            processed: false,
        };
        let record = DeliveryRecord::from_event(&event);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["event_id"], 7);
        assert_eq!(value["topic"], "enrollment.created");
        assert_eq!(value["payload"]["userId"], 456);
        assert!(value["created_at"].is_string());
        assert!(value["delivered_at"].is_string());
    }

    #[test]
    fn sink_error_display_http_status() {
        let err = SinkError::HttpStatus(502);
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }
}
