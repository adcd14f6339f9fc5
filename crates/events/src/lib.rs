//! LearnHub notification outbox.
//!
//! Domain events are appended to a durable outbox by business handlers and
//! delivered asynchronously by a single polling worker:
//!
//! - [`OutboxPublisher`]: best-effort append of one event per call.
//! - [`OutboxStore`]: durable event store with a transaction facility,
//!   backed by Postgres ([`PgOutboxStore`]) or memory ([`InMemoryOutboxStore`]).
//! - [`NotificationSink`]: delivery target (console, file, webhook).
//! - [`OutboxWorker`]: periodic claim → deliver → mark-processed cycle.
//! - [`StatusReporter`]: read-only worker status for health checks.
//!
//! Delivery is at-least-once: a batch that fails part-way is rolled back and
//! redelivered in full on the next cycle, so sinks must tolerate duplicates.

pub mod config;
pub mod publisher;
pub mod sink;
pub mod status;
pub mod store;
pub mod worker;

pub use config::{ConfigError, NotificationConfig, SinkKind};
pub use publisher::{publish_in_transaction, OutboxPublisher, PublishError};
pub use sink::{build_sink, ConsoleSink, FileSink, NotificationSink, SinkError, WebhookSink};
pub use status::{NotificationStatus, StatusError, StatusReporter, StatusSource, WorkerStatus};
pub use store::{
    InMemoryOutboxStore, OutboxStore, OutboxTransaction, PgOutboxStore, StoreError,
};
pub use worker::{CycleError, CycleReport, OutboxWorker, WorkerState};
