//! The in-memory operation registry.

use crate::{HistoryError, HistoryResult, OperationId, OperationKind, OperationRecord};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Number of entries reported in [`HistoryStats::recent`].
const RECENT_LIMIT: usize = 10;

/// Registry mapping operation ids to their records.
///
/// Constructed once at startup and injected into the engine; holds undo
/// state for the lifetime of the process. All access goes through an async
/// `RwLock`, so the registry can be shared freely behind an `Arc`.
#[derive(Debug, Default)]
pub struct OperationHistory {
    entries: RwLock<HashMap<OperationId, OperationRecord>>,
}

/// Result of rolling an operation back.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    pub operation_id: OperationId,
    pub restored_path: PathBuf,
    pub kind: OperationKind,
    pub restored_at: DateTime<Utc>,
}

/// Aggregate view of the registry without snapshot content.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    pub total_operations: usize,
    /// The most recent entries, oldest first.
    pub recent: Vec<OperationSummary>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// One entry in [`HistoryStats::recent`].
#[derive(Debug, Clone, Serialize)]
pub struct OperationSummary {
    pub operation_id: OperationId,
    pub kind: OperationKind,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub has_backup: bool,
}

impl OperationHistory {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record.
    ///
    /// Ids are random, so a collision is not expected; if one occurs the
    /// insert silently overwrites the older entry.
    pub async fn record(&self, record: OperationRecord) {
        debug!(
            operation = %record.id,
            kind = %record.kind,
            path = %record.path.display(),
            "Recorded operation"
        );
        let mut entries = self.entries.write().await;
        entries.insert(record.id.clone(), record);
    }

    /// The target path of a recorded operation, if the id is known.
    pub async fn target_path(&self, id: &OperationId) -> Option<PathBuf> {
        self.entries.read().await.get(id).map(|r| r.path.clone())
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Restore the target file of `id` to its pre-mutation content.
    ///
    /// The restore is a direct write, not a temp-and-rename commit: rollback
    /// is itself a repair action, so restoring correct content wins over
    /// crash-atomicity. On success the backup file is deleted (best-effort)
    /// and the entry leaves the registry, so a second rollback with the same
    /// id fails with `NotFound`.
    pub async fn rollback(&self, id: &OperationId) -> HistoryResult<RestoreOutcome> {
        let mut entries = self.entries.write().await;

        let record = entries
            .get(id)
            .ok_or_else(|| HistoryError::not_found(id.as_str()))?;
        let snapshot = record
            .snapshot
            .as_ref()
            .ok_or_else(|| HistoryError::missing_snapshot(id.as_str()))?;

        fs::write(&record.path, &snapshot.content).await?;

        let record = entries
            .remove(id)
            .ok_or_else(|| HistoryError::not_found(id.as_str()))?;

        if let Some(backup) = &record.backup_path {
            if let Err(e) = fs::remove_file(backup).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        backup = %backup.display(),
                        error = %e,
                        "Failed to delete backup file during rollback"
                    );
                }
            }
        }

        info!(operation = %record.id, path = %record.path.display(), "Rolled back operation");

        Ok(RestoreOutcome {
            operation_id: record.id,
            restored_path: record.path,
            kind: record.kind,
            restored_at: Utc::now(),
        })
    }

    /// Remove every entry older than `max_age_hours`, deleting its backup
    /// file best-effort. Returns the number of entries removed.
    pub async fn sweep_expired(&self, max_age_hours: i64) -> usize {
        let cutoff = Utc::now() - Duration::hours(max_age_hours);
        let mut entries = self.entries.write().await;

        let expired: Vec<OperationId> = entries
            .values()
            .filter(|r| r.created_at <= cutoff)
            .map(|r| r.id.clone())
            .collect();

        for id in &expired {
            if let Some(record) = entries.remove(id) {
                if let Some(backup) = &record.backup_path {
                    if let Err(e) = fs::remove_file(backup).await {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            warn!(
                                backup = %backup.display(),
                                error = %e,
                                "Failed to delete expired backup file"
                            );
                        }
                    }
                }
                debug!(operation = %record.id, "Expired operation record");
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Swept expired operation records");
        }

        expired.len()
    }

    /// Aggregate counters for observability.
    pub async fn stats(&self) -> HistoryStats {
        let entries = self.entries.read().await;

        let mut summaries: Vec<OperationSummary> = entries
            .values()
            .map(|r| OperationSummary {
                operation_id: r.id.clone(),
                kind: r.kind,
                path: r.path.clone(),
                created_at: r.created_at,
                has_backup: r.backup_path.is_some(),
            })
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let total_operations = summaries.len();
        let oldest = summaries.first().map(|s| s.created_at);
        let newest = summaries.last().map(|s| s.created_at);
        let recent = summaries.split_off(total_operations.saturating_sub(RECENT_LIMIT));

        HistoryStats {
            total_operations,
            recent,
            oldest,
            newest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileSnapshot;
    use std::path::Path;
    use tempfile::TempDir;

    async fn backed_up_record(path: &Path) -> OperationRecord {
        let snapshot = FileSnapshot::capture(path).await.unwrap();
        let backup_path = path.with_extension("txt.backup.test");
        fs::write(&backup_path, &snapshot.content).await.unwrap();
        OperationRecord::new(OperationKind::ReplaceLines, snapshot, Some(backup_path))
    }

    #[tokio::test]
    async fn test_rollback_restores_content() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("test.txt");
        fs::write(&file, "original content").await.unwrap();

        let history = OperationHistory::new();
        let record = backed_up_record(&file).await;
        let id = record.id.clone();
        let backup = record.backup_path.clone().unwrap();
        history.record(record).await;

        fs::write(&file, "mutated content").await.unwrap();

        let outcome = history.rollback(&id).await.unwrap();
        assert_eq!(outcome.restored_path, file);
        assert_eq!(outcome.kind, OperationKind::ReplaceLines);

        let content = fs::read_to_string(&file).await.unwrap();
        assert_eq!(content, "original content");
        assert!(!backup.exists());
    }

    #[tokio::test]
    async fn test_second_rollback_fails_not_found() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("test.txt");
        fs::write(&file, "content").await.unwrap();

        let history = OperationHistory::new();
        let record = backed_up_record(&file).await;
        let id = record.id.clone();
        history.record(record).await;

        history.rollback(&id).await.unwrap();
        let err = history.rollback(&id).await.unwrap_err();
        assert!(matches!(err, HistoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rollback_unknown_id() {
        let history = OperationHistory::new();
        let err = history
            .rollback(&OperationId::from_string("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rollback_without_snapshot() {
        let history = OperationHistory::new();
        let record = OperationRecord {
            id: OperationId::new(),
            kind: OperationKind::Backup,
            path: PathBuf::from("/tmp/whatever.txt"),
            backup_path: None,
            snapshot: None,
            created_at: Utc::now(),
        };
        let id = record.id.clone();
        history.record(record).await;

        let err = history.rollback(&id).await.unwrap_err();
        assert!(matches!(err, HistoryError::MissingSnapshot(_)));
    }

    #[tokio::test]
    async fn test_sweep_expired_zero_removes_fresh_record() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("test.txt");
        fs::write(&file, "content").await.unwrap();

        let history = OperationHistory::new();
        let record = backed_up_record(&file).await;
        let id = record.id.clone();
        let backup = record.backup_path.clone().unwrap();
        history.record(record).await;

        let swept = history.sweep_expired(0).await;
        assert_eq!(swept, 1);
        assert!(!backup.exists());

        let err = history.rollback(&id).await.unwrap_err();
        assert!(matches!(err, HistoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_sweep_keeps_recent_records() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("test.txt");
        fs::write(&file, "content").await.unwrap();

        let history = OperationHistory::new();
        history.record(backed_up_record(&file).await).await;

        let swept = history.sweep_expired(24).await;
        assert_eq!(swept, 0);
        assert_eq!(history.len().await, 1);
    }

    #[tokio::test]
    async fn test_stats_caps_recent_entries() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("test.txt");
        fs::write(&file, "content").await.unwrap();

        let history = OperationHistory::new();
        for _ in 0..12 {
            let snapshot = FileSnapshot::capture(&file).await.unwrap();
            history
                .record(OperationRecord::new(OperationKind::InsertLines, snapshot, None))
                .await;
        }

        let stats = history.stats().await;
        assert_eq!(stats.total_operations, 12);
        assert_eq!(stats.recent.len(), 10);
        assert!(stats.oldest.is_some());
        assert!(stats.newest.is_some());
        assert!(stats.oldest <= stats.newest);
        assert!(!stats.recent[0].has_backup);
    }
}
