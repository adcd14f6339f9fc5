//! Best-effort outbox publisher.
//!
//! [`OutboxPublisher::publish`] is what business handlers call after a
//! successful write. It never fails the caller: problems are logged and
//! reported as `None`, so a broken outbox can delay notifications but never
//! abort an enrollment or certificate issue.

use learnhub_core::topics::is_valid_topic;
use learnhub_core::types::DbId;
use learnhub_db::repositories::OutboxRepo;
use serde::Serialize;
use sqlx::PgConnection;

use crate::store::OutboxStore;

/// Appends domain events to the outbox.
///
/// Cheap to clone when the store is (both provided stores are).
#[derive(Clone)]
pub struct OutboxPublisher<S> {
    store: S,
    delivery_enabled: bool,
}

impl<S: OutboxStore> OutboxPublisher<S> {
    /// Create a publisher over `store`.
    ///
    /// `delivery_enabled` is the process-wide notification flag, captured
    /// once from configuration.
    pub fn new(store: S, delivery_enabled: bool) -> Self {
        Self {
            store,
            delivery_enabled,
        }
    }

    /// Whether notification delivery is switched on for this process.
    ///
    /// Callers check this before publishing. It does not gate `publish`
    /// itself: an event published while disabled is still stored.
    pub fn is_delivery_enabled(&self) -> bool {
        self.delivery_enabled
    }

    /// Append one event and return its id, or `None` if it was not stored.
    pub async fn publish<T>(&self, topic: &str, payload: &T) -> Option<DbId>
    where
        T: Serialize + ?Sized,
    {
        if !is_valid_topic(topic) {
            tracing::warn!(topic, "Refusing to publish outbox event with blank topic");
            return None;
        }

        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, topic, "Failed to serialize outbox payload");
                return None;
            }
        };

        match self.store.insert(topic, &payload).await {
            Ok(id) => {
                tracing::debug!(event_id = id, topic, "Outbox event published");
                Some(id)
            }
            Err(e) => {
                tracing::error!(error = %e, topic, "Failed to publish outbox event");
                None
            }
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Error type for [`publish_in_transaction`].
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Outbox topic must not be blank")]
    BlankTopic,

    #[error("Failed to serialize outbox payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Append an event on the caller's own connection or transaction.
///
/// Use this instead of [`OutboxPublisher::publish`] when the event must
/// commit or roll back together with the business write that caused it.
/// Errors are returned because the caller owns the transaction and decides
/// whether to abort it.
pub async fn publish_in_transaction<T>(
    conn: &mut PgConnection,
    topic: &str,
    payload: &T,
) -> Result<DbId, PublishError>
where
    T: Serialize + ?Sized,
{
    if !is_valid_topic(topic) {
        return Err(PublishError::BlankTopic);
    }
    let payload = serde_json::to_value(payload)?;
    Ok(OutboxRepo::insert(conn, topic, &payload).await?)
}
