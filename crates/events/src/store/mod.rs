//! Durable event store abstraction.
//!
//! The worker needs exactly one capability from storage: a transaction in
//! which it can claim unprocessed events and mark them processed, with
//! nothing visible to other readers until commit. [`OutboxStore`] and
//! [`OutboxTransaction`] describe that capability; [`PgOutboxStore`] is the
//! production implementation and [`InMemoryOutboxStore`] backs tests and
//! local development.

use async_trait::async_trait;
use learnhub_core::types::DbId;
use learnhub_db::models::outbox_event::OutboxEvent;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryOutboxStore;
pub use postgres::{PgOutboxStore, PgOutboxTransaction};

/// Error type for event store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying database query or transaction failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store could not be reached.
    #[error("Outbox store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only store of outbox events.
#[async_trait]
pub trait OutboxStore: Send + Sync + 'static {
    type Transaction: OutboxTransaction;

    /// Durably append one unprocessed event and return its id.
    async fn insert(&self, topic: &str, payload: &serde_json::Value) -> Result<DbId, StoreError>;

    /// Open a transaction for one poll cycle.
    async fn begin(&self) -> Result<Self::Transaction, StoreError>;

    /// Best-effort count of unprocessed events.
    async fn pending_count(&self) -> Result<i64, StoreError>;
}

/// A unit of work against the outbox.
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// every change made through it.
#[async_trait]
pub trait OutboxTransaction: Send {
    /// Claim up to `limit` unprocessed events in ascending id order.
    async fn claim_pending(&mut self, limit: u32) -> Result<Vec<OutboxEvent>, StoreError>;

    /// Mark the given events processed; returns how many rows changed.
    async fn mark_processed(&mut self, ids: &[DbId]) -> Result<u64, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
