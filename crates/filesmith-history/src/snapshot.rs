//! Snapshot and operation record data structures.

use chrono::{DateTime, Utc};
use filesmith_util::content_hash;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Unique identifier for a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub String);

impl OperationId {
    /// Create a new random operation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create an operation ID from a string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of operation a record was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ReplaceLines,
    DeleteLines,
    InsertLines,
    FindAndReplace,
    Backup,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::ReplaceLines => "replace_lines",
            OperationKind::DeleteLines => "delete_lines",
            OperationKind::InsertLines => "insert_lines",
            OperationKind::FindAndReplace => "find_and_replace",
            OperationKind::Backup => "backup",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time copy of a file's full content.
///
/// Immutable once taken; a snapshot is owned by the operation record that
/// references it and is the unit of undo state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSnapshot {
    /// The file the snapshot was taken of.
    pub path: PathBuf,

    /// Full file content at capture time.
    pub content: String,

    /// SHA-256 of the content.
    pub content_hash: String,

    /// Content size in bytes.
    pub size_bytes: u64,

    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
}

impl FileSnapshot {
    /// Capture a snapshot of the file at `path`.
    ///
    /// Returns `None` when the file cannot be read (missing file included);
    /// the caller decides whether that is an error.
    pub async fn capture(path: &Path) -> Option<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Some(Self::from_content(path, content)),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Snapshot capture failed");
                None
            }
        }
    }

    /// Build a snapshot from content that has already been read.
    pub fn from_content(path: &Path, content: String) -> Self {
        let content_hash = content_hash(&content);
        let size_bytes = content.len() as u64;
        Self {
            path: path.to_path_buf(),
            content,
            content_hash,
            size_bytes,
            captured_at: Utc::now(),
        }
    }
}

/// Bookkeeping entry linking an operation id to its snapshot and backup file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Unique identifier for this operation.
    pub id: OperationId,

    /// What the operation did.
    pub kind: OperationKind,

    /// The mutated file.
    pub path: PathBuf,

    /// On-disk backup file holding the pre-mutation content, if one was
    /// written.
    pub backup_path: Option<PathBuf>,

    /// Pre-mutation snapshot. Rollback fails without it.
    #[serde(default)]
    pub snapshot: Option<FileSnapshot>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl OperationRecord {
    /// Create a new record with a fresh id.
    pub fn new(kind: OperationKind, snapshot: FileSnapshot, backup_path: Option<PathBuf>) -> Self {
        Self {
            id: OperationId::new(),
            kind,
            path: snapshot.path.clone(),
            backup_path,
            snapshot: Some(snapshot),
            created_at: Utc::now(),
        }
    }

    /// Replace the generated id with one allocated earlier in the call.
    pub fn with_id(mut self, id: OperationId) -> Self {
        self.id = id;
        self
    }
}
