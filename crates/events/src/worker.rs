//! Outbox delivery worker.
//!
//! [`OutboxWorker`] owns one background Tokio task that wakes every
//! `poll_interval` and runs a poll cycle against the store:
//!
//! 1. begin a transaction;
//! 2. claim up to `batch_size` unprocessed events, oldest id first;
//! 3. hand each event to the sink, in order;
//! 4. mark the whole batch processed and commit.
//!
//! Any failure rolls the transaction back, so no event in the batch is
//! marked, and the same batch is delivered again on the next tick. Cycles
//! never overlap, and [`OutboxWorker::stop`] waits for the one in flight.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use learnhub_core::types::{DbId, Timestamp};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::NotificationConfig;
use crate::sink::{NotificationSink, SinkError};
use crate::status::{StatusSource, WorkerStatus};
use crate::store::{OutboxStore, OutboxTransaction, StoreError};

// ---------------------------------------------------------------------------
// Error / report
// ---------------------------------------------------------------------------

/// Why a poll cycle was rolled back.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// Begin, claim, mark or commit failed.
    #[error("Outbox store error: {0}")]
    Store(#[from] StoreError),

    /// The sink rejected an event; the whole batch is retried.
    #[error("Sink failed to deliver event {event_id}: {source}")]
    Sink {
        event_id: DbId,
        #[source]
        source: SinkError,
    },
}

/// Outcome of a committed poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Events claimed (and delivered) in this cycle.
    pub claimed: usize,
    /// Rows flipped to processed.
    pub marked: u64,
}

/// Lifecycle of the background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Stopped,
    Running,
}

// ---------------------------------------------------------------------------
// OutboxWorker
// ---------------------------------------------------------------------------

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Shared between the worker handle and its background task.
struct WorkerCore<S> {
    store: S,
    sink: Arc<dyn NotificationSink>,
    enabled: bool,
    poll_interval: Duration,
    batch_size: u32,
    running: AtomicBool,
    cycles: AtomicU64,
    /// Only locked for a copy, never across an await.
    last_run_at: StdMutex<Option<Timestamp>>,
    pending_estimate: AtomicI64,
}

/// Single-process polling worker delivering outbox events to one sink.
pub struct OutboxWorker<S: OutboxStore> {
    core: Arc<WorkerCore<S>>,
    task: Mutex<Option<RunningTask>>,
}

impl<S: OutboxStore> OutboxWorker<S> {
    /// Create a stopped worker. The sink is fixed for the worker's lifetime.
    pub fn new(store: S, sink: Arc<dyn NotificationSink>, config: &NotificationConfig) -> Self {
        Self {
            core: Arc::new(WorkerCore {
                store,
                sink,
                enabled: config.enabled,
                poll_interval: config.poll_interval,
                batch_size: config.batch_size.max(1),
                running: AtomicBool::new(false),
                cycles: AtomicU64::new(0),
                last_run_at: StdMutex::new(None),
                pending_estimate: AtomicI64::new(0),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start polling. Calling this while already running does nothing.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            tracing::debug!("Outbox worker already running");
            return;
        }

        let cancel = CancellationToken::new();
        let core = Arc::clone(&self.core);
        let token = cancel.clone();
        let handle = tokio::spawn(async move { core.run(token).await });

        self.core.running.store(true, Ordering::SeqCst);
        *task = Some(RunningTask { cancel, handle });
    }

    /// Stop polling and wait for any in-flight cycle to finish.
    ///
    /// Calling this while stopped does nothing.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        let Some(RunningTask { cancel, handle }) = task.take() else {
            return;
        };

        cancel.cancel();
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Outbox worker task ended abnormally");
        }
        self.core.running.store(false, Ordering::SeqCst);
        tracing::info!("Outbox worker stopped");
    }

    pub fn state(&self) -> WorkerState {
        if self.core.running.load(Ordering::SeqCst) {
            WorkerState::Running
        } else {
            WorkerState::Stopped
        }
    }

    /// Run one poll cycle immediately, outside the schedule.
    ///
    /// Useful for draining the outbox in tests and maintenance tasks. Do not
    /// call this concurrently with a running worker against a store that
    /// lacks row-level claim locking.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        self.core.poll().await
    }

    /// Snapshot of the worker's operational state. Never blocks.
    pub fn status(&self) -> WorkerStatus {
        let last_run_at = *self
            .core
            .last_run_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        WorkerStatus {
            enabled: self.core.enabled,
            interval_ms: u64::try_from(self.core.poll_interval.as_millis()).unwrap_or(u64::MAX),
            last_run_at,
            pending_estimate: self.core.pending_estimate.load(Ordering::SeqCst),
            sink: self.core.sink.kind(),
        }
    }

    /// Number of cycles started since construction.
    pub fn cycle_count(&self) -> u64 {
        self.core.cycles.load(Ordering::SeqCst)
    }
}

impl<S: OutboxStore> StatusSource for OutboxWorker<S> {
    fn status(&self) -> WorkerStatus {
        OutboxWorker::status(self)
    }
}

impl<S: OutboxStore> WorkerCore<S> {
    /// The scheduling loop; exits when `cancel` fires.
    ///
    /// A tick that arrives mid-cycle is delayed rather than bursted, and
    /// cancellation is only observed between cycles.
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            batch_size = self.batch_size,
            sink = %self.sink.kind(),
            "Outbox worker started",
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Outbox worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    // Errors are logged inside `poll`. The cycle runs in its own
                    // task so a panicking sink cannot end the schedule.
                    let core = Arc::clone(&self);
                    if let Err(e) = tokio::spawn(async move { core.poll().await }).await {
                        tracing::error!(
                            error = %e,
                            cycle = self.cycles.load(Ordering::SeqCst),
                            "Outbox poll cycle panicked, batch rolled back"
                        );
                        self.finish_cycle().await;
                    }
                }
            }
        }
    }

    /// Run one cycle and record its completion.
    async fn poll(&self) -> Result<CycleReport, CycleError> {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.execute_cycle().await;

        match &result {
            Ok(report) if report.claimed > 0 => {
                tracing::info!(
                    cycle,
                    claimed = report.claimed,
                    marked = report.marked,
                    "Outbox batch delivered"
                );
            }
            Ok(_) => tracing::trace!(cycle, "Outbox empty"),
            Err(e) => {
                tracing::error!(error = %e, cycle, "Outbox poll cycle failed, batch rolled back");
            }
        }

        self.finish_cycle().await;
        result
    }

    /// Record the end of a cycle, whatever its outcome.
    async fn finish_cycle(&self) {
        *self
            .last_run_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        self.refresh_pending_estimate().await;
    }

    /// Begin → claim/deliver/mark → commit, or roll back on any error.
    async fn execute_cycle(&self) -> Result<CycleReport, CycleError> {
        let mut tx = self.store.begin().await?;

        match self.claim_and_deliver(&mut tx).await {
            Ok(report) => {
                tx.commit().await?;
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Outbox rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn claim_and_deliver(&self, tx: &mut S::Transaction) -> Result<CycleReport, CycleError> {
        let batch = tx.claim_pending(self.batch_size).await?;
        if batch.is_empty() {
            return Ok(CycleReport::default());
        }

        for event in &batch {
            self.sink
                .deliver(event)
                .await
                .map_err(|source| CycleError::Sink {
                    event_id: event.id,
                    source,
                })?;
        }

        let ids: Vec<DbId> = batch.iter().map(|e| e.id).collect();
        let marked = tx.mark_processed(&ids).await?;

        Ok(CycleReport {
            claimed: batch.len(),
            marked,
        })
    }

    async fn refresh_pending_estimate(&self) {
        match self.store.pending_count().await {
            Ok(count) => self.pending_estimate.store(count, Ordering::SeqCst),
            Err(e) => tracing::debug!(error = %e, "Could not refresh outbox pending estimate"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
