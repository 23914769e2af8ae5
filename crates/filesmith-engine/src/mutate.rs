//! Range-addressed line mutations.
//!
//! Every mutating operation follows the same shape: allocate an operation
//! id, take the per-path lock, snapshot the current content, apply the
//! edit in memory, commit through a temp-file rename, then write the
//! backup sibling and history record. A fault after the snapshot triggers
//! a best-effort restore of the old content, so a failed operation leaves
//! the file as it found it.

use crate::accel::AccelWriteRequest;
use crate::read::read_existing;
use crate::{Engine, EngineError, EngineResult, MutationError};
use chrono::Utc;
use filesmith_history::{FileSnapshot, OperationId, OperationKind, OperationRecord};
use filesmith_util::content_hash;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Replacement content for line edits, accepted either as one string that
/// is split on `\n` or as pre-split lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NewContent {
    Text(String),
    Lines(Vec<String>),
}

impl NewContent {
    fn into_lines(self) -> Vec<String> {
        match self {
            NewContent::Text(text) => text.split('\n').map(str::to_string).collect(),
            NewContent::Lines(lines) => lines,
        }
    }
}

/// Result of a line replacement.
#[derive(Debug, Serialize)]
pub struct ReplaceOutcome {
    pub operation_id: OperationId,
    pub original_range: String,
    pub replaced_lines: usize,
    pub new_lines: usize,
    pub total_lines: usize,
    pub backup_created: bool,
    pub file_hash: String,
}

/// Result of a line deletion.
#[derive(Debug, Serialize)]
pub struct DeleteOutcome {
    pub operation_id: OperationId,
    pub deleted_range: String,
    pub deleted_lines: usize,
    pub total_lines: usize,
    pub backup_created: bool,
    pub file_hash: String,
}

/// Result of a line insertion.
#[derive(Debug, Serialize)]
pub struct InsertOutcome {
    pub operation_id: OperationId,
    pub insert_position: usize,
    pub inserted_lines: usize,
    pub total_lines: usize,
    pub backup_created: bool,
    pub file_hash: String,
}

/// Result of a whole-file find and replace.
#[derive(Debug, Serialize)]
pub struct FindReplaceOutcome {
    pub operation_id: OperationId,
    pub search_pattern: String,
    pub replacement: String,
    pub use_regex: bool,
    pub replacements: usize,
    pub backup_created: bool,
    pub file_hash: String,
}

/// Result of an explicit backup request.
#[derive(Debug, Serialize)]
pub struct BackupOutcome {
    pub operation_id: OperationId,
    pub backup_path: String,
    pub file_hash: String,
}

/// Sibling path the pre-mutation content is backed up to.
fn backup_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".backup.{}", Utc::now().timestamp_micros()));
    PathBuf::from(name)
}

/// Sibling path for the temp file a commit writes before renaming.
///
/// Random suffix avoids collisions and predictable names.
fn temp_sibling(path: &Path) -> PathBuf {
    let random_suffix: u64 = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
        ^ u64::from(std::process::id());
    let temp_name = format!(
        ".{}.{:x}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        random_suffix
    );
    path.parent()
        .map(|p| p.join(&temp_name))
        .unwrap_or_else(|| PathBuf::from(&temp_name))
}

/// Rebuild the line vector with `insert` standing in for
/// `lines[keep_before..resume_from]`.
fn splice(lines: &[&str], keep_before: usize, resume_from: usize, insert: &[String]) -> Vec<String> {
    let mut updated = Vec::with_capacity(lines.len() - (resume_from - keep_before) + insert.len());
    updated.extend(lines[..keep_before].iter().map(|s| (*s).to_string()));
    updated.extend(insert.iter().cloned());
    updated.extend(lines[resume_from..].iter().map(|s| (*s).to_string()));
    updated
}

fn check_line_range(start_line: usize, end_line: usize, total: usize) -> EngineResult<()> {
    if start_line < 1 || start_line > total {
        return Err(EngineError::invalid_range(format!(
            "start line {start_line} out of bounds (1-{total})"
        )));
    }
    if end_line < start_line || end_line > total {
        return Err(EngineError::invalid_range(format!(
            "end line {end_line} out of bounds ({start_line}-{total})"
        )));
    }
    Ok(())
}

impl Engine {
    /// Replace lines `start_line..=end_line` (1-based, inclusive) with
    /// `new_content`. The replacement may hold a different line count.
    pub async fn replace_lines(
        &self,
        file_path: &str,
        start_line: usize,
        end_line: usize,
        new_content: NewContent,
        backup: bool,
    ) -> Result<ReplaceOutcome, MutationError> {
        let operation_id = OperationId::new();
        let path = self.resolver.resolve(file_path);
        let _guard = self.locks.acquire(&path).await;

        let snapshot = match self.snapshot_target(&path).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(MutationError::new(operation_id, e)),
        };

        let applied = self
            .apply_replace(
                &operation_id,
                &snapshot,
                start_line,
                end_line,
                new_content,
                backup,
            )
            .await;
        match applied {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.restore_snapshot(&snapshot).await;
                Err(MutationError::new(operation_id, e))
            }
        }
    }

    /// Delete lines `start_line..=end_line` (1-based, inclusive).
    pub async fn delete_lines(
        &self,
        file_path: &str,
        start_line: usize,
        end_line: usize,
        backup: bool,
    ) -> Result<DeleteOutcome, MutationError> {
        let operation_id = OperationId::new();
        let path = self.resolver.resolve(file_path);
        let _guard = self.locks.acquire(&path).await;

        let snapshot = match self.snapshot_target(&path).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(MutationError::new(operation_id, e)),
        };

        let applied = self
            .apply_delete(&operation_id, &snapshot, start_line, end_line, backup)
            .await;
        match applied {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.restore_snapshot(&snapshot).await;
                Err(MutationError::new(operation_id, e))
            }
        }
    }

    /// Insert `new_content` at `position`: 0 prepends, the current line
    /// count appends, anything beyond that is out of bounds.
    pub async fn insert_lines(
        &self,
        file_path: &str,
        position: usize,
        new_content: NewContent,
        backup: bool,
    ) -> Result<InsertOutcome, MutationError> {
        let operation_id = OperationId::new();
        let path = self.resolver.resolve(file_path);
        let _guard = self.locks.acquire(&path).await;

        let snapshot = match self.snapshot_target(&path).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(MutationError::new(operation_id, e)),
        };

        let applied = self
            .apply_insert(&operation_id, &snapshot, position, new_content, backup)
            .await;
        match applied {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.restore_snapshot(&snapshot).await;
                Err(MutationError::new(operation_id, e))
            }
        }
    }

    /// Replace every occurrence of `pattern` across the whole file.
    ///
    /// Literal mode matches the exact substring; regex mode matches
    /// globally. The replacement is always inserted verbatim. Zero
    /// matches leave the file untouched and record nothing.
    pub async fn find_and_replace(
        &self,
        file_path: &str,
        pattern: &str,
        replacement: &str,
        use_regex: bool,
        backup: bool,
    ) -> Result<FindReplaceOutcome, MutationError> {
        let operation_id = OperationId::new();
        let path = self.resolver.resolve(file_path);
        let _guard = self.locks.acquire(&path).await;

        let snapshot = match self.snapshot_target(&path).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(MutationError::new(operation_id, e)),
        };

        let applied = self
            .apply_find_replace(
                &operation_id,
                &snapshot,
                pattern,
                replacement,
                use_regex,
                backup,
            )
            .await;
        match applied {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.restore_snapshot(&snapshot).await;
                Err(MutationError::new(operation_id, e))
            }
        }
    }

    /// Write a backup sibling for `file_path` and record it so the file
    /// can be rolled back to this point.
    pub async fn backup_file(&self, file_path: &str) -> Result<BackupOutcome, MutationError> {
        let operation_id = OperationId::new();
        let path = self.resolver.resolve(file_path);
        let _guard = self.locks.acquire(&path).await;

        let snapshot = match self.snapshot_target(&path).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(MutationError::new(operation_id, e)),
        };

        match self
            .record_backup(&operation_id, OperationKind::Backup, &snapshot)
            .await
        {
            Ok(backup_path) => {
                info!(
                    path = %snapshot.path.display(),
                    operation_id = %operation_id,
                    backup = %backup_path.display(),
                    "Backup written"
                );
                Ok(BackupOutcome {
                    operation_id,
                    backup_path: backup_path.display().to_string(),
                    file_hash: snapshot.content_hash,
                })
            }
            Err(e) => Err(MutationError::new(operation_id, e)),
        }
    }

    async fn apply_replace(
        &self,
        operation_id: &OperationId,
        snapshot: &FileSnapshot,
        start_line: usize,
        end_line: usize,
        new_content: NewContent,
        backup: bool,
    ) -> EngineResult<ReplaceOutcome> {
        let lines: Vec<&str> = snapshot.content.split('\n').collect();
        check_line_range(start_line, end_line, lines.len())?;

        let insert = new_content.into_lines();
        let new_lines = insert.len();
        let updated_lines = splice(&lines, start_line - 1, end_line, &insert);
        let total_lines = updated_lines.len();
        let updated = updated_lines.join("\n");

        let backup_created = self
            .commit_and_record(
                operation_id,
                OperationKind::ReplaceLines,
                snapshot,
                &updated,
                backup,
            )
            .await?;

        info!(
            path = %snapshot.path.display(),
            operation_id = %operation_id,
            "Replaced lines {start_line}-{end_line} with {new_lines} lines"
        );

        Ok(ReplaceOutcome {
            operation_id: operation_id.clone(),
            original_range: format!("{start_line}-{end_line}"),
            replaced_lines: end_line - start_line + 1,
            new_lines,
            total_lines,
            backup_created,
            file_hash: content_hash(&updated),
        })
    }

    async fn apply_delete(
        &self,
        operation_id: &OperationId,
        snapshot: &FileSnapshot,
        start_line: usize,
        end_line: usize,
        backup: bool,
    ) -> EngineResult<DeleteOutcome> {
        let lines: Vec<&str> = snapshot.content.split('\n').collect();
        check_line_range(start_line, end_line, lines.len())?;

        let updated_lines = splice(&lines, start_line - 1, end_line, &[]);
        let total_lines = updated_lines.len();
        let updated = updated_lines.join("\n");

        let backup_created = self
            .commit_and_record(
                operation_id,
                OperationKind::DeleteLines,
                snapshot,
                &updated,
                backup,
            )
            .await?;

        info!(
            path = %snapshot.path.display(),
            operation_id = %operation_id,
            "Deleted lines {start_line}-{end_line}"
        );

        Ok(DeleteOutcome {
            operation_id: operation_id.clone(),
            deleted_range: format!("{start_line}-{end_line}"),
            deleted_lines: end_line - start_line + 1,
            total_lines,
            backup_created,
            file_hash: content_hash(&updated),
        })
    }

    async fn apply_insert(
        &self,
        operation_id: &OperationId,
        snapshot: &FileSnapshot,
        position: usize,
        new_content: NewContent,
        backup: bool,
    ) -> EngineResult<InsertOutcome> {
        let lines: Vec<&str> = snapshot.content.split('\n').collect();
        let total = lines.len();
        if position > total {
            return Err(EngineError::invalid_range(format!(
                "insert position {position} out of bounds (0-{total})"
            )));
        }

        let insert = new_content.into_lines();
        let inserted_lines = insert.len();
        let updated_lines = splice(&lines, position, position, &insert);
        let total_lines = updated_lines.len();
        let updated = updated_lines.join("\n");

        let backup_created = self
            .commit_and_record(
                operation_id,
                OperationKind::InsertLines,
                snapshot,
                &updated,
                backup,
            )
            .await?;

        info!(
            path = %snapshot.path.display(),
            operation_id = %operation_id,
            "Inserted {inserted_lines} lines at position {position}"
        );

        Ok(InsertOutcome {
            operation_id: operation_id.clone(),
            insert_position: position,
            inserted_lines,
            total_lines,
            backup_created,
            file_hash: content_hash(&updated),
        })
    }

    async fn apply_find_replace(
        &self,
        operation_id: &OperationId,
        snapshot: &FileSnapshot,
        pattern: &str,
        replacement: &str,
        use_regex: bool,
        backup: bool,
    ) -> EngineResult<FindReplaceOutcome> {
        let (updated, replacements) = if use_regex {
            let re = Regex::new(pattern).map_err(|e| EngineError::invalid_pattern(e.to_string()))?;
            let replacements = re.find_iter(&snapshot.content).count();
            let updated = re
                .replace_all(&snapshot.content, regex::NoExpand(replacement))
                .into_owned();
            (updated, replacements)
        } else {
            let replacements = snapshot.content.matches(pattern).count();
            (snapshot.content.replace(pattern, replacement), replacements)
        };

        let backup_created = if replacements > 0 {
            self.commit_and_record(
                operation_id,
                OperationKind::FindAndReplace,
                snapshot,
                &updated,
                backup,
            )
            .await?
        } else {
            false
        };

        info!(
            path = %snapshot.path.display(),
            operation_id = %operation_id,
            "Replaced {replacements} occurrences"
        );

        Ok(FindReplaceOutcome {
            operation_id: operation_id.clone(),
            search_pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            use_regex,
            replacements,
            backup_created,
            file_hash: content_hash(&updated),
        })
    }

    async fn snapshot_target(&self, path: &Path) -> EngineResult<FileSnapshot> {
        let content = read_existing(path).await?;
        Ok(FileSnapshot::from_content(path, content))
    }

    /// Best-effort rewrite of the pre-mutation content after a failed
    /// operation. Commits are all-or-nothing, so the target holds either
    /// the old or the new content in full when this runs.
    async fn restore_snapshot(&self, snapshot: &FileSnapshot) {
        if let Err(e) = fs::write(&snapshot.path, &snapshot.content).await {
            warn!(
                path = %snapshot.path.display(),
                error = %e,
                "Restore after failed mutation failed"
            );
        }
    }

    async fn commit_and_record(
        &self,
        operation_id: &OperationId,
        kind: OperationKind,
        snapshot: &FileSnapshot,
        updated: &str,
        backup: bool,
    ) -> EngineResult<bool> {
        self.commit_atomic(&snapshot.path, updated).await?;
        if backup {
            self.record_backup(operation_id, kind, snapshot).await?;
        }
        Ok(backup)
    }

    /// Write `content` to a temp sibling and rename it over `path`, so a
    /// crash mid-write cannot leave a half-written file. The accelerator
    /// writes the temp file when configured; the rename is always direct.
    pub(crate) async fn commit_atomic(&self, path: &Path, content: &str) -> EngineResult<()> {
        let temp_path = temp_sibling(path);

        let mut written = false;
        if let Some(accelerator) = &self.accelerator {
            let request = AccelWriteRequest {
                path: temp_path.clone(),
                content: content.to_string(),
            };
            match accelerator.write(request).await {
                Ok(_) => written = true,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Accelerator write failed, falling back to direct I/O"
                    );
                }
            }
        }
        if !written {
            fs::write(&temp_path, content).await?;
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn record_backup(
        &self,
        operation_id: &OperationId,
        kind: OperationKind,
        snapshot: &FileSnapshot,
    ) -> EngineResult<PathBuf> {
        let backup_path = backup_sibling(&snapshot.path);
        fs::write(&backup_path, &snapshot.content).await?;

        let record = OperationRecord::new(kind, snapshot.clone(), Some(backup_path.clone()))
            .with_id(operation_id.clone());
        self.history.record(record).await;
        Ok(backup_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_engine, write_file};

    fn numbered_lines(count: usize) -> String {
        (1..=count)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn read(path: &Path) -> String {
        fs::read_to_string(path).await.unwrap()
    }

    fn backup_siblings(dir: &Path, name: &str) -> Vec<PathBuf> {
        let prefix = format!("{name}.backup.");
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .map(|n| n.to_string_lossy().starts_with(&prefix))
                    .unwrap_or(false)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_replace_lines_shrinks_file() {
        let (dir, engine) = test_engine();
        let path = write_file(&dir, "file.txt", &numbered_lines(10)).await;

        let outcome = engine
            .replace_lines(
                "file.txt",
                3,
                5,
                NewContent::Text("new 1\nnew 2".into()),
                true,
            )
            .await
            .unwrap();

        assert_eq!(outcome.original_range, "3-5");
        assert_eq!(outcome.replaced_lines, 3);
        assert_eq!(outcome.new_lines, 2);
        assert_eq!(outcome.total_lines, 9);
        assert!(outcome.backup_created);

        let content = read(&path).await;
        assert_eq!(
            content,
            "line 1\nline 2\nnew 1\nnew 2\nline 6\nline 7\nline 8\nline 9\nline 10"
        );
        assert_eq!(outcome.file_hash, content_hash(&content));

        assert_eq!(engine.history().len().await, 1);
        let backups = backup_siblings(dir.path(), "file.txt");
        assert_eq!(backups.len(), 1);
        assert_eq!(read(&backups[0]).await, numbered_lines(10));
    }

    #[tokio::test]
    async fn test_replace_accepts_line_array() {
        let (dir, engine) = test_engine();
        let path = write_file(&dir, "file.txt", "a\nb\nc").await;

        engine
            .replace_lines(
                "file.txt",
                2,
                2,
                NewContent::Lines(vec!["x".into(), "y".into()]),
                false,
            )
            .await
            .unwrap();

        assert_eq!(read(&path).await, "a\nx\ny\nc");
    }

    #[tokio::test]
    async fn test_replace_preserves_trailing_newline() {
        let (dir, engine) = test_engine();
        let path = write_file(&dir, "file.txt", "a\nb\nc\n").await;

        engine
            .replace_lines("file.txt", 2, 2, NewContent::Text("x".into()), false)
            .await
            .unwrap();

        assert_eq!(read(&path).await, "a\nx\nc\n");
    }

    #[tokio::test]
    async fn test_replace_rejects_bad_ranges() {
        let (dir, engine) = test_engine();
        write_file(&dir, "file.txt", &numbered_lines(10)).await;

        let err = engine
            .replace_lines("file.txt", 0, 2, NewContent::Text("x".into()), false)
            .await
            .unwrap_err();
        assert!(matches!(err.source, EngineError::InvalidRange(_)));

        let err = engine
            .replace_lines("file.txt", 2, 11, NewContent::Text("x".into()), false)
            .await
            .unwrap_err();
        assert!(matches!(err.source, EngineError::InvalidRange(_)));

        let err = engine
            .replace_lines("file.txt", 5, 3, NewContent::Text("x".into()), false)
            .await
            .unwrap_err();
        assert!(matches!(err.source, EngineError::InvalidRange(_)));
    }

    #[tokio::test]
    async fn test_delete_then_insert_is_identity() {
        let (dir, engine) = test_engine();
        let path = write_file(&dir, "file.txt", "one\ntwo\nthree").await;

        let deleted = engine
            .delete_lines("file.txt", 2, 2, false)
            .await
            .unwrap();
        assert_eq!(deleted.deleted_lines, 1);
        assert_eq!(read(&path).await, "one\nthree");

        let inserted = engine
            .insert_lines("file.txt", 1, NewContent::Text("two".into()), false)
            .await
            .unwrap();
        assert_eq!(inserted.inserted_lines, 1);
        assert_eq!(read(&path).await, "one\ntwo\nthree");
    }

    #[tokio::test]
    async fn test_insert_bounds() {
        let (dir, engine) = test_engine();
        let path = write_file(&dir, "file.txt", "b").await;

        engine
            .insert_lines("file.txt", 0, NewContent::Text("a".into()), false)
            .await
            .unwrap();
        assert_eq!(read(&path).await, "a\nb");

        engine
            .insert_lines("file.txt", 2, NewContent::Text("c".into()), false)
            .await
            .unwrap();
        assert_eq!(read(&path).await, "a\nb\nc");

        let err = engine
            .insert_lines("file.txt", 9, NewContent::Text("z".into()), false)
            .await
            .unwrap_err();
        assert!(matches!(err.source, EngineError::InvalidRange(_)));
    }

    #[tokio::test]
    async fn test_no_backup_skips_history() {
        let (dir, engine) = test_engine();
        write_file(&dir, "file.txt", "a\nb").await;

        let outcome = engine
            .replace_lines("file.txt", 1, 1, NewContent::Text("x".into()), false)
            .await
            .unwrap();

        assert!(!outcome.backup_created);
        assert!(engine.history().is_empty().await);
        assert!(backup_siblings(dir.path(), "file.txt").is_empty());
    }

    #[tokio::test]
    async fn test_rollback_restores_and_consumes_record() {
        let (dir, engine) = test_engine();
        let path = write_file(&dir, "file.txt", "original").await;

        let outcome = engine
            .replace_lines("file.txt", 1, 1, NewContent::Text("changed".into()), true)
            .await
            .unwrap();
        assert_eq!(read(&path).await, "changed");

        let restored = engine
            .rollback_operation(&outcome.operation_id)
            .await
            .unwrap();
        assert_eq!(restored.operation_id, outcome.operation_id);
        assert_eq!(read(&path).await, "original");
        assert!(backup_siblings(dir.path(), "file.txt").is_empty());

        let err = engine
            .rollback_operation(&outcome.operation_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::History(_)));
    }

    #[tokio::test]
    async fn test_find_and_replace_literal() {
        let (dir, engine) = test_engine();
        let path = write_file(&dir, "file.txt", "foo bar foo\nfoo").await;

        let outcome = engine
            .find_and_replace("file.txt", "foo", "baz", false, true)
            .await
            .unwrap();

        assert_eq!(outcome.replacements, 3);
        assert!(outcome.backup_created);
        assert_eq!(read(&path).await, "baz bar baz\nbaz");
    }

    #[tokio::test]
    async fn test_find_and_replace_zero_matches_is_noop() {
        let (dir, engine) = test_engine();
        let path = write_file(&dir, "file.txt", "nothing here").await;

        let outcome = engine
            .find_and_replace("file.txt", "absent", "x", false, true)
            .await
            .unwrap();

        assert_eq!(outcome.replacements, 0);
        assert!(!outcome.backup_created);
        assert_eq!(outcome.file_hash, content_hash("nothing here"));
        assert_eq!(read(&path).await, "nothing here");
        assert!(engine.history().is_empty().await);
        assert!(backup_siblings(dir.path(), "file.txt").is_empty());
    }

    #[tokio::test]
    async fn test_find_and_replace_regex_inserts_verbatim() {
        let (dir, engine) = test_engine();
        let path = write_file(&dir, "file.txt", "foo fo fizz").await;

        let outcome = engine
            .find_and_replace("file.txt", r"f(o+)", "$1", true, false)
            .await
            .unwrap();

        assert_eq!(outcome.replacements, 2);
        assert_eq!(read(&path).await, "$1 $1 fizz");
    }

    #[tokio::test]
    async fn test_find_and_replace_rejects_bad_regex() {
        let (dir, engine) = test_engine();
        write_file(&dir, "file.txt", "content").await;

        let err = engine
            .find_and_replace("file.txt", "(", "x", true, false)
            .await
            .unwrap_err();
        assert!(matches!(err.source, EngineError::InvalidPattern(_)));
    }

    #[tokio::test]
    async fn test_backup_file_records_sibling() {
        let (dir, engine) = test_engine();
        write_file(&dir, "file.txt", "keep me").await;

        let outcome = engine.backup_file("file.txt").await.unwrap();

        assert_eq!(outcome.file_hash, content_hash("keep me"));
        assert_eq!(read(Path::new(&outcome.backup_path)).await, "keep me");
        assert_eq!(engine.history().len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_file_carries_operation_id() {
        let (_dir, engine) = test_engine();

        let err = engine
            .replace_lines("absent.txt", 1, 1, NewContent::Text("x".into()), true)
            .await
            .unwrap_err();

        assert!(matches!(err.source, EngineError::NotFound(_)));
        assert!(!err.operation_id.as_str().is_empty());
    }
}
