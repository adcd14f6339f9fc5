//! Webhook sink with short exponential-backoff retry.
//!
//! [`WebhookSink`] POSTs a JSON [`DeliveryRecord`] to one configured URL.
//! Failed attempts are retried with short delays (250 ms, 500 ms, 1 s). The
//! worker holds the batch's row locks while delivering, so each attempt has a
//! short timeout and one event may take at most [`DELIVERY_BUDGET`] in total;
//! anything still failing fails the batch and is retried on the next tick.

use std::time::Duration;

use async_trait::async_trait;
use learnhub_core::types::DbId;
use learnhub_db::models::outbox_event::OutboxEvent;

use super::{DeliveryRecord, NotificationSink, SinkError};
use crate::config::SinkKind;

/// Retry delays in milliseconds (exponential backoff).
const RETRY_DELAYS_MS: [u64; 3] = [250, 500, 1_000];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound on all attempts for one event, backoff included.
pub const DELIVERY_BUDGET: Duration = Duration::from_secs(5);

/// Delivers outbox events to an external webhook endpoint.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    /// Create a sink posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default webhook HTTP client");
                reqwest::Client::new()
            });
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, body: &serde_json::Value) -> Result<(), SinkError> {
        let response = self.client.post(&self.url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(SinkError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }

    /// POST `body` with the fixed backoff schedule, then one final attempt.
    async fn send_with_retry(&self, event_id: DbId, body: &serde_json::Value) -> Result<(), SinkError> {
        for (attempt, delay_ms) in RETRY_DELAYS_MS.iter().enumerate() {
            match self.try_send(body).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url = %self.url,
                        event_id,
                        error = %e,
                        "Webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(body).await.inspect_err(|e| {
            tracing::error!(
                url = %self.url,
                event_id,
                error = %e,
                "Webhook delivery failed after all retries"
            );
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Webhook
    }

    async fn deliver(&self, event: &OutboxEvent) -> Result<(), SinkError> {
        let body = serde_json::to_value(DeliveryRecord::from_event(event))?;

        match tokio::time::timeout(DELIVERY_BUDGET, self.send_with_retry(event.id, &body)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    url = %self.url,
                    event_id = event.id,
                    budget_ms = DELIVERY_BUDGET.as_millis() as u64,
                    "Webhook delivery exceeded its time budget"
                );
                Err(SinkError::Timeout(DELIVERY_BUDGET))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    #[test]
    fn new_does_not_panic() {
        let sink = WebhookSink::new("https://hooks.example.com/learnhub");
        assert_eq!(sink.url(), "https://hooks.example.com/learnhub");
        assert_eq!(sink.kind(), SinkKind::Webhook);
    }

    fn event() -> OutboxEvent {
        OutboxEvent {
            id: 1,
            topic: "enrollment.created".to_string(),
            payload: json!({}),
            created_at: Utc::now(),
            processed: false,
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_after_retries() {
        // Port 9 (discard) on loopback refuses connections in test envs.
        let sink = WebhookSink::new("http://127.0.0.1:9/hook");
        assert_matches!(sink.deliver(&event()).await, Err(SinkError::Request(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_endpoint_is_cut_off_at_delivery_budget() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let sink = WebhookSink::new(format!("http://{addr}/hook"));
        let started = tokio::time::Instant::now();
        let result = sink.deliver(&event()).await;

        assert_matches!(result, Err(SinkError::Timeout(budget)) if budget == DELIVERY_BUDGET);
        assert!(started.elapsed() <= DELIVERY_BUDGET + Duration::from_millis(100));
    }
}
