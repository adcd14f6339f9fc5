//! Outbox event entity model.

use learnhub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `outbox_events` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: DbId,
    /// Dot-separated event kind, e.g. `"enrollment.created"`.
    pub topic: String,
    /// Topic-specific document, stored verbatim.
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub processed: bool,
}
