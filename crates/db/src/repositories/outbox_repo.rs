//! Repository for the `outbox_events` table.
//!
//! Read and insert helpers accept any [`PgExecutor`] so callers can run them
//! on the pool or inside their own transaction. The claim/mark pair takes a
//! connection because it is only meaningful inside the worker's transaction.

use learnhub_core::types::DbId;
use sqlx::{PgConnection, PgExecutor};

use crate::models::outbox_event::OutboxEvent;

/// Column list for `outbox_events` queries.
const COLUMNS: &str = "id, topic, payload, created_at, processed";

/// Provides append, claim and mark operations for outbox events.
pub struct OutboxRepo;

impl OutboxRepo {
    /// Append a new unprocessed event, returning the generated ID.
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        topic: &str,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO outbox_events (topic, payload, processed) \
             VALUES ($1, $2, false) \
             RETURNING id",
        )
        .bind(topic)
        .bind(payload)
        .fetch_one(executor)
        .await
    }

    /// Find an event by its ID.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<OutboxEvent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM outbox_events WHERE id = $1");
        sqlx::query_as::<_, OutboxEvent>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lock up to `limit` unprocessed events, oldest ID first.
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` so a second worker running against the
    /// same table skips rows already claimed instead of delivering them twice
    /// in parallel. The locks are held until the surrounding transaction ends.
    pub async fn claim_pending(
        conn: &mut PgConnection,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM outbox_events \
             WHERE processed = false \
             ORDER BY id ASC \
             LIMIT $1 \
             FOR UPDATE SKIP LOCKED"
        );
        sqlx::query_as::<_, OutboxEvent>(&query)
            .bind(limit)
            .fetch_all(conn)
            .await
    }

    /// Mark the given events processed in a single statement.
    ///
    /// Returns the number of rows that flipped from unprocessed to processed.
    pub async fn mark_processed(
        conn: &mut PgConnection,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE outbox_events \
             SET processed = true \
             WHERE id = ANY($1) AND processed = false",
        )
        .bind(ids)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Count events still awaiting delivery.
    pub async fn pending_count<'e>(executor: impl PgExecutor<'e>) -> Result<i64, sqlx::Error> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT COUNT(*) FROM outbox_events WHERE processed = false")
                .fetch_one(executor)
                .await?;
        Ok(count.unwrap_or(0))
    }
}
