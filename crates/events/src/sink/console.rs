//! Console sink: one structured log line per event.

use async_trait::async_trait;
use learnhub_db::models::outbox_event::OutboxEvent;

use super::{NotificationSink, SinkError};
use crate::config::SinkKind;

/// Renders events through `tracing` under the `learnhub::notifications`
/// target, so they land wherever the process sends its diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }

    async fn deliver(&self, event: &OutboxEvent) -> Result<(), SinkError> {
        tracing::info!(
            target: "learnhub::notifications",
            event_id = event.id,
            topic = %event.topic,
            created_at = %event.created_at,
            payload = %event.payload,
            "Notification delivered"
        );
        Ok(())
    }
}
