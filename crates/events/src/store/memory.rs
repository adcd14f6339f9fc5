//! In-memory outbox store.
//!
//! Transactions are serialized by an owned lock so at most one poll cycle
//! is open at a time. Marks are staged on the transaction and only applied
//! to the shared event list on commit; inserts never wait on an open
//! transaction, matching how a concurrent `INSERT` behaves in Postgres.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use learnhub_core::types::DbId;
use learnhub_db::models::outbox_event::OutboxEvent;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{OutboxStore, OutboxTransaction, StoreError};

#[derive(Default)]
struct Shared {
    events: Mutex<Vec<OutboxEvent>>,
    tx_lock: Arc<Mutex<()>>,
    next_id: AtomicI64,
    unavailable: AtomicBool,
    fail_marks: AtomicBool,
}

/// Outbox store held entirely in process memory.
///
/// Cloning yields another handle to the same events.
#[derive(Clone, Default)]
pub struct InMemoryOutboxStore {
    shared: Arc<Shared>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store: every operation fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `mark_processed` fail while set.
    pub fn set_fail_marks(&self, fail: bool) {
        self.shared.fail_marks.store(fail, Ordering::SeqCst);
    }

    /// Look up a committed event by id.
    pub async fn get(&self, id: DbId) -> Option<OutboxEvent> {
        let events = self.shared.events.lock().await;
        events.iter().find(|e| e.id == id).cloned()
    }

    /// Snapshot of every committed event in id order.
    pub async fn events(&self) -> Vec<OutboxEvent> {
        self.shared.events.lock().await.clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    type Transaction = InMemoryTransaction;

    async fn insert(&self, topic: &str, payload: &serde_json::Value) -> Result<DbId, StoreError> {
        self.check_available()?;
        let mut events = self.shared.events.lock().await;
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        events.push(OutboxEvent {
            id,
            topic: topic.to_string(),
            payload: payload.clone(),
            created_at: Utc::now(),
            processed: false,
        });
        Ok(id)
    }

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        self.check_available()?;
        let guard = Arc::clone(&self.shared.tx_lock).lock_owned().await;
        Ok(InMemoryTransaction {
            store: self.clone(),
            staged: BTreeSet::new(),
            _guard: guard,
        })
    }

    async fn pending_count(&self) -> Result<i64, StoreError> {
        self.check_available()?;
        let events = self.shared.events.lock().await;
        Ok(events.iter().filter(|e| !e.processed).count() as i64)
    }
}

/// An open in-memory transaction with staged marks.
pub struct InMemoryTransaction {
    store: InMemoryOutboxStore,
    staged: BTreeSet<DbId>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl OutboxTransaction for InMemoryTransaction {
    async fn claim_pending(&mut self, limit: u32) -> Result<Vec<OutboxEvent>, StoreError> {
        self.store.check_available()?;
        let events = self.store.shared.events.lock().await;
        Ok(events
            .iter()
            .filter(|e| !e.processed && !self.staged.contains(&e.id))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_processed(&mut self, ids: &[DbId]) -> Result<u64, StoreError> {
        self.store.check_available()?;
        if self.store.shared.fail_marks.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("mark_processed rejected".to_string()));
        }
        let events = self.store.shared.events.lock().await;
        let mut changed = 0;
        for id in ids {
            let pending = events.iter().any(|e| e.id == *id && !e.processed);
            if pending && self.staged.insert(*id) {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.store.check_available()?;
        let mut events = self.store.shared.events.lock().await;
        for event in events.iter_mut() {
            if self.staged.contains(&event.id) {
                event.processed = true;
            }
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
