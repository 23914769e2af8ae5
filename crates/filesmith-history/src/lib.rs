//! Operation history for filesmith.
//!
//! This crate provides the undo state for mutating file operations:
//! - Point-in-time snapshots of file content before a mutation
//! - An in-memory registry mapping operation ids to their records
//! - Rollback of any recorded operation to its pre-mutation content
//! - Time-based expiry of records and their on-disk backup files
//!
//! History lives for the process lifetime only; nothing is persisted across
//! restarts.
//!
//! # Example
//!
//! ```no_run
//! use filesmith_history::{FileSnapshot, OperationHistory, OperationKind, OperationRecord};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let history = OperationHistory::new();
//!
//! let snapshot = FileSnapshot::capture(Path::new("/project/src/main.rs"))
//!     .await
//!     .expect("file exists");
//! let record = OperationRecord::new(OperationKind::ReplaceLines, snapshot, None);
//! let id = record.id.clone();
//! history.record(record).await;
//!
//! // ... mutate the file ...
//!
//! history.rollback(&id).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod history;
mod snapshot;

pub use error::{HistoryError, HistoryResult};
pub use history::{HistoryStats, OperationHistory, OperationSummary, RestoreOutcome};
pub use snapshot::{FileSnapshot, OperationId, OperationKind, OperationRecord};
