//! File sink: appends one JSON line per event to a log file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use learnhub_db::models::outbox_event::OutboxEvent;
use tokio::io::AsyncWriteExt;

use super::{DeliveryRecord, NotificationSink, SinkError};
use crate::config::SinkKind;

/// Appends a [`DeliveryRecord`] line per event to `path`.
///
/// The parent directory is created on demand. The file is opened in append
/// mode for every delivery, so external rotation is picked up without a
/// restart.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl NotificationSink for FileSink {
    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    async fn deliver(&self, event: &OutboxEvent) -> Result<(), SinkError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let mut line = serde_json::to_string(&DeliveryRecord::from_event(event))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(
            event_id = event.id,
            path = %self.path.display(),
            "Notification appended to file"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn event(id: i64, topic: &str) -> OutboxEvent {
        OutboxEvent {
            id,
            topic: topic.to_string(),
            payload: json!({"n": id}),
            created_at: Utc::now(),
            processed: false,
        }
    }

    #[tokio::test]
    async fn appends_one_line_per_event_and_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/notifications.log");
        let sink = FileSink::new(&path);

        sink.deliver(&event(1, "enrollment.created")).await.unwrap();
        sink.deliver(&event(2, "certificate.issued")).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event_id"], 1);
        assert_eq!(lines[0]["topic"], "enrollment.created");
        assert_eq!(lines[1]["event_id"], 2);
        assert_eq!(lines[1]["payload"]["n"], 2);
    }

    #[tokio::test]
    async fn existing_content_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifications.log");
        tokio::fs::write(&path, "previous\n").await.unwrap();

        FileSink::new(&path)
            .deliver(&event(3, "quiz.submitted"))
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.starts_with("previous\n"));
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn filesystem_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected.
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, "x").await.unwrap();
        let sink = FileSink::new(blocker.join("notifications.log"));

        assert_matches!(
            sink.deliver(&event(4, "lesson.completed")).await,
            Err(SinkError::Io(_))
        );
    }
}
