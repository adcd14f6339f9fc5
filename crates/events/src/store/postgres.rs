//! Postgres-backed outbox store.

use async_trait::async_trait;
use learnhub_core::types::DbId;
use learnhub_db::models::outbox_event::OutboxEvent;
use learnhub_db::repositories::OutboxRepo;
use learnhub_db::DbPool;
use sqlx::{Postgres, Transaction};

use super::{OutboxStore, OutboxTransaction, StoreError};

/// Outbox store over the `outbox_events` table.
#[derive(Clone)]
pub struct PgOutboxStore {
    pool: DbPool,
}

impl PgOutboxStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    type Transaction = PgOutboxTransaction;

    async fn insert(&self, topic: &str, payload: &serde_json::Value) -> Result<DbId, StoreError> {
        Ok(OutboxRepo::insert(&self.pool, topic, payload).await?)
    }

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgOutboxTransaction { tx })
    }

    async fn pending_count(&self) -> Result<i64, StoreError> {
        Ok(OutboxRepo::pending_count(&self.pool).await?)
    }
}

/// A database transaction holding row locks on the claimed events.
pub struct PgOutboxTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OutboxTransaction for PgOutboxTransaction {
    async fn claim_pending(&mut self, limit: u32) -> Result<Vec<OutboxEvent>, StoreError> {
        Ok(OutboxRepo::claim_pending(&mut self.tx, i64::from(limit)).await?)
    }

    async fn mark_processed(&mut self, ids: &[DbId]) -> Result<u64, StoreError> {
        Ok(OutboxRepo::mark_processed(&mut self.tx, ids).await?)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
