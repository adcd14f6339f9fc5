//! Read-only notification status for health checks.
//!
//! The [`StatusReporter`] is handed to the HTTP layer at startup. It answers
//! with the disabled shape when delivery is switched off and otherwise with
//! the worker's live [`WorkerStatus`].

use std::sync::Arc;

use learnhub_core::types::Timestamp;
use serde::Serialize;

use crate::config::SinkKind;

// ---------------------------------------------------------------------------
// Status shapes
// ---------------------------------------------------------------------------

/// Operational state of a running delivery worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerStatus {
    pub enabled: bool,
    /// Poll interval in milliseconds.
    pub interval_ms: u64,
    /// End of the most recent completed cycle, committed or rolled back.
    pub last_run_at: Option<Timestamp>,
    /// Unprocessed events as of the last cycle; may lag concurrent publishes.
    pub pending_estimate: i64,
    pub sink: SinkKind,
}

/// What the health endpoint reports for notifications.
///
/// Serializes to exactly `{"enabled": false}` when disabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NotificationStatus {
    Disabled { enabled: bool },
    Enabled(WorkerStatus),
}

impl NotificationStatus {
    pub fn disabled() -> Self {
        NotificationStatus::Disabled { enabled: false }
    }
}

/// Anything that can describe its worker status synchronously.
pub trait StatusSource: Send + Sync {
    fn status(&self) -> WorkerStatus;
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for status queries.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// Delivery is enabled but no worker was attached at startup.
    #[error("Notification worker is not attached")]
    WorkerUnavailable,
}

// ---------------------------------------------------------------------------
// StatusReporter
// ---------------------------------------------------------------------------

/// Thin read-only accessor used by the health endpoint.
#[derive(Clone)]
pub struct StatusReporter {
    enabled: bool,
    source: Option<Arc<dyn StatusSource>>,
}

impl StatusReporter {
    /// Reporter for a process with notification delivery switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            source: None,
        }
    }

    /// Reporter delegating to `source` while delivery is enabled.
    pub fn new(enabled: bool, source: Option<Arc<dyn StatusSource>>) -> Self {
        Self { enabled, source }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current notification status.
    pub fn report(&self) -> Result<NotificationStatus, StatusError> {
        if !self.enabled {
            return Ok(NotificationStatus::disabled());
        }
        let source = self.source.as_ref().ok_or(StatusError::WorkerUnavailable)?;
        Ok(NotificationStatus::Enabled(source.status()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
