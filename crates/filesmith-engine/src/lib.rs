//! Line-addressed file mutation engine.
//!
//! The engine performs range-addressed edits against text files with
//! crash-safe atomic commits, records per-operation undo state in an
//! injected [`OperationHistory`], and runs batch and multi-file
//! orchestration on top of the same primitives. External accelerator and
//! embedding subsystems are reached through narrow traits with bounded
//! timeouts; reads and writes fall back to direct I/O when a collaborator
//! fails.
//!
//! Mutating operations that target the same resolved path are serialized
//! through a per-path async mutex, so two concurrent edits queue instead
//! of silently discarding each other's commit.
//!
//! # Example
//!
//! ```no_run
//! use filesmith_engine::{Engine, EngineConfig, NewContent};
//! use filesmith_history::OperationHistory;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let history = Arc::new(OperationHistory::new());
//! let engine = Engine::new(EngineConfig::default(), history);
//!
//! let outcome = engine
//!     .replace_lines("src/main.rs", 3, 5, NewContent::Text("// new".into()), true)
//!     .await?;
//! println!("now {} lines", outcome.total_lines);
//! # Ok(())
//! # }
//! ```

mod analyze;
mod batch;
mod collab;
mod create;
mod diff;
mod error;
mod lock;
mod mutate;
mod read;
mod scan;

pub mod accel;
pub mod embed;
pub mod mock;

pub use accel::{
    AccelReadRequest, AccelReadResponse, AccelWriteRequest, AccelWriteResponse, BenchmarkOutcome,
    CommandAccelerator, FileAccelerator, ReadPerformance, WritePerformance,
};
pub use analyze::{CompressionLevel, CompressionOutcome, Validation, ValidationOutcome};
pub use batch::{BatchOutcome, FsOperation, MultiFileItem, MultiFileOptions, MultiFileOutcome};
pub use create::CreateOutcome;
pub use diff::{DiffOutcome, DifferenceKind, LineDifference};
pub use embed::{
    CacheInfo, CommandEmbedding, EmbedCreateRequest, EmbedRemoveRequest, EmbeddingIndex,
    ProcessCompleteOutcome, SimilarRequest,
};
pub use error::{EngineError, EngineResult, MutationError};
pub use mutate::{
    BackupOutcome, DeleteOutcome, FindReplaceOutcome, InsertOutcome, NewContent, ReplaceOutcome,
};
pub use read::{ChunkedReadOutcome, ReadChunk};
pub use scan::{StructureFilter, StructureKind, StructureMatch, StructuresOutcome};

use filesmith_history::{HistoryStats, OperationHistory, OperationId, RestoreOutcome};
use filesmith_util::PathResolver;
use lock::PathLocks;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::warn;

/// Engine configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Project root against which relative paths resolve.
    pub root: PathBuf,
    /// Directory holding the embedding index sidecar files.
    pub embeddings_dir: PathBuf,
    /// Accelerator binary; probed once at startup.
    pub accelerator_bin: Option<PathBuf>,
    /// Embedding manager binary; probed once at startup.
    pub embedding_bin: Option<PathBuf>,
    /// Age after which operation records and backups are swept.
    pub backup_max_age_hours: i64,
    /// Default chunk size for chunked reads.
    pub default_chunk_size: usize,
    /// Timeout applied to every collaborator invocation.
    pub collaborator_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            embeddings_dir: PathBuf::from("embeddings"),
            accelerator_bin: None,
            embedding_bin: None,
            backup_max_age_hours: 24,
            default_chunk_size: 50,
            collaborator_timeout: Duration::from_secs(30),
        }
    }
}

/// The file mutation engine.
///
/// Holds the path resolver, the injected operation history, the per-path
/// lock table, and the optional collaborator clients. Cheap to share
/// behind an `Arc`; all methods take `&self`.
pub struct Engine {
    resolver: PathResolver,
    history: Arc<OperationHistory>,
    locks: PathLocks,
    accelerator: Option<Arc<dyn FileAccelerator>>,
    embeddings: Option<Arc<dyn EmbeddingIndex>>,
    config: EngineConfig,
}

/// Composite payload for the performance-stats action.
#[derive(Debug, Serialize)]
pub struct StatsOutcome {
    pub performance: PerformanceOverview,
    pub history: HistoryStats,
    pub auto_cleanup: AutoCleanupPolicy,
}

#[derive(Debug, Serialize)]
pub struct PerformanceOverview {
    pub total_operations: usize,
    pub system_status: SystemStatus,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub accelerator_available: bool,
    pub embedding_available: bool,
    pub embeddings_dir_exists: bool,
}

#[derive(Debug, Serialize)]
pub struct AutoCleanupPolicy {
    pub enabled: bool,
    pub max_age_hours: i64,
    pub status: &'static str,
}

impl Engine {
    /// Build an engine from its configuration and an injected history.
    ///
    /// Collaborator binaries named in the config are probed once here;
    /// a configured but missing binary logs a warning and the engine
    /// runs without that collaborator.
    pub fn new(config: EngineConfig, history: Arc<OperationHistory>) -> Self {
        let resolver = PathResolver::new(config.root.clone());

        let accelerator = match &config.accelerator_bin {
            Some(bin) if bin.exists() => Some(Arc::new(CommandAccelerator::new(
                bin.clone(),
                config.collaborator_timeout,
            )) as Arc<dyn FileAccelerator>),
            Some(bin) => {
                warn!(
                    binary = %bin.display(),
                    "Accelerator binary not found, reads and writes use direct I/O"
                );
                None
            }
            None => None,
        };

        let embeddings = match &config.embedding_bin {
            Some(bin) if bin.exists() => Some(Arc::new(CommandEmbedding::new(
                bin.clone(),
                config.collaborator_timeout,
            )) as Arc<dyn EmbeddingIndex>),
            Some(bin) => {
                warn!(
                    binary = %bin.display(),
                    "Embedding manager binary not found, embedding operations disabled"
                );
                None
            }
            None => None,
        };

        Self {
            resolver,
            history,
            locks: PathLocks::new(),
            accelerator,
            embeddings,
            config,
        }
    }

    /// Replace the accelerator client, mainly for tests.
    pub fn with_accelerator(mut self, accelerator: Arc<dyn FileAccelerator>) -> Self {
        self.accelerator = Some(accelerator);
        self
    }

    /// Replace the embedding client, mainly for tests.
    pub fn with_embedding_index(mut self, index: Arc<dyn EmbeddingIndex>) -> Self {
        self.embeddings = Some(index);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<OperationHistory> {
        &self.history
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Undo a recorded operation, restoring its pre-mutation snapshot.
    ///
    /// Takes the target path's lock first so the restore cannot interleave
    /// with an in-flight mutation of the same file.
    pub async fn rollback_operation(&self, id: &OperationId) -> EngineResult<RestoreOutcome> {
        let _guard = match self.history.target_path(id).await {
            Some(path) => Some(self.locks.acquire(&path).await),
            None => None,
        };
        Ok(self.history.rollback(id).await?)
    }

    /// History stats merged with collaborator availability and the
    /// auto-cleanup policy.
    pub async fn performance_stats(&self) -> StatsOutcome {
        let history = self.history.stats().await;
        let embeddings_dir_exists = fs::try_exists(&self.config.embeddings_dir)
            .await
            .unwrap_or(false);

        StatsOutcome {
            performance: PerformanceOverview {
                total_operations: history.total_operations,
                system_status: SystemStatus {
                    accelerator_available: self.accelerator.is_some(),
                    embedding_available: self.embeddings.is_some(),
                    embeddings_dir_exists,
                },
            },
            history,
            auto_cleanup: AutoCleanupPolicy {
                enabled: true,
                max_age_hours: self.config.backup_max_age_hours,
                status: "automatic",
            },
        }
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
