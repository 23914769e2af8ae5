//! Embedding index collaborator.
//!
//! The index lives in an external process; the engine only issues
//! create/similar/remove requests and inspects the sidecar files the
//! index maintains (`file_paths.json` and `index.bin` under the
//! configured embeddings directory). Sidecar checks are cheap local
//! reads, so callers can skip a collaborator round trip when the
//! embedding already exists.

use crate::batch::failure_value;
use crate::read::ChunkedReadOutcome;
use crate::{collab, elapsed_ms, Engine, EngineError, EngineResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;

/// Request to create or refresh one file's embedding.
#[derive(Debug, Clone)]
pub struct EmbedCreateRequest {
    pub path: PathBuf,
    pub force_recreate: bool,
}

/// Request for the files most similar to one file.
#[derive(Debug, Clone)]
pub struct SimilarRequest {
    pub path: PathBuf,
    pub top_k: usize,
}

/// Request to drop one file's embedding.
#[derive(Debug, Clone)]
pub struct EmbedRemoveRequest {
    pub path: PathBuf,
}

/// Narrow interface to the embedding index.
///
/// Responses are passed through as JSON payloads; the engine does not
/// interpret them beyond the success flag.
#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    async fn create(&self, request: EmbedCreateRequest) -> EngineResult<Value>;
    async fn find_similar(&self, request: SimilarRequest) -> EngineResult<Value>;
    async fn remove(&self, request: EmbedRemoveRequest) -> EngineResult<Value>;
}

/// Embedding client backed by an external binary.
#[derive(Debug, Clone)]
pub struct CommandEmbedding {
    binary: PathBuf,
    timeout: Duration,
}

impl CommandEmbedding {
    pub fn new(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }
}

#[async_trait]
impl EmbeddingIndex for CommandEmbedding {
    async fn create(&self, request: EmbedCreateRequest) -> EngineResult<Value> {
        let params = json!({
            "filepath": request.path.display().to_string(),
            "force_recreate": request.force_recreate,
        });
        collab::invoke(&self.binary, "create", &params, self.timeout).await
    }

    async fn find_similar(&self, request: SimilarRequest) -> EngineResult<Value> {
        let params = json!({
            "filepath": request.path.display().to_string(),
            "top_k": request.top_k,
        });
        collab::invoke(&self.binary, "similar", &params, self.timeout).await
    }

    async fn remove(&self, request: EmbedRemoveRequest) -> EngineResult<Value> {
        let params = json!({ "filepath": request.path.display().to_string() });
        collab::invoke(&self.binary, "remove", &params, self.timeout).await
    }
}

/// Snapshot of the on-disk embedding cache state.
#[derive(Debug, Serialize)]
pub struct CacheInfo {
    pub cached_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_files: Option<usize>,
    pub index_size_kb: u64,
    pub last_updated: Option<DateTime<Utc>>,
    pub status: &'static str,
}

impl CacheInfo {
    fn empty() -> Self {
        Self {
            cached_files: 0,
            existing_files: None,
            missing_files: None,
            index_size_kb: 0,
            last_updated: None,
            status: "empty",
        }
    }
}

/// Result of the read-embed-similar pipeline.
#[derive(Debug, Serialize)]
pub struct ProcessCompleteOutcome {
    pub results: ProcessCompleteResults,
    pub summary: ProcessCompleteSummary,
}

#[derive(Debug, Serialize)]
pub struct ProcessCompleteResults {
    pub file_read: ChunkedReadOutcome,
    pub embedding_created: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similar_files: Option<Value>,
    pub performance_stats: ProcessTimings,
}

#[derive(Debug, Serialize)]
pub struct ProcessTimings {
    pub read_time_ms: u64,
    pub embedding_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_search_time_ms: Option<u64>,
    pub total_time_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ProcessCompleteSummary {
    pub file_processed: String,
    pub chunks_created: usize,
    pub embedding_status: &'static str,
    pub similar_files_found: usize,
    pub total_processing_time_ms: u64,
}

impl Engine {
    fn embedding_index(&self) -> EngineResult<&Arc<dyn EmbeddingIndex>> {
        self.embeddings
            .as_ref()
            .ok_or_else(|| EngineError::collaborator("no embedding index configured"))
    }

    /// Ask the index to embed `file_path`.
    pub async fn create_file_embedding(
        &self,
        file_path: &str,
        force_recreate: bool,
    ) -> EngineResult<Value> {
        let path = self.resolver.resolve(file_path);
        self.embedding_index()?
            .create(EmbedCreateRequest {
                path,
                force_recreate,
            })
            .await
    }

    /// Ask the index for the `top_k` files most similar to `file_path`.
    pub async fn find_similar_files(&self, file_path: &str, top_k: usize) -> EngineResult<Value> {
        let path = self.resolver.resolve(file_path);
        self.embedding_index()?
            .find_similar(SimilarRequest { path, top_k })
            .await
    }

    /// Drop `file_path` from the index.
    pub async fn cleanup_file_embedding(&self, file_path: &str) -> EngineResult<Value> {
        let path = self.resolver.resolve(file_path);
        let removed = self
            .embedding_index()?
            .remove(EmbedRemoveRequest { path: path.clone() })
            .await?;
        Ok(json!({
            "message": format!("Embedding removed for {}", path.display()),
            "embedding_cleanup": removed,
        }))
    }

    /// Check the sidecar listing for `file_path` without a collaborator
    /// round trip. Any read or parse problem reads as "no embedding".
    pub async fn has_embedding(&self, file_path: &str) -> bool {
        let resolved = self.resolver.resolve(file_path);
        let listing = self.config.embeddings_dir.join("file_paths.json");

        let Ok(raw) = fs::read_to_string(&listing).await else {
            return false;
        };
        match serde_json::from_str::<Vec<PathBuf>>(&raw) {
            Ok(paths) => paths.contains(&resolved),
            Err(_) => false,
        }
    }

    /// Summarize the sidecar files: how many paths are indexed, how many
    /// of them still exist, and how big and fresh the index is.
    pub async fn embedding_cache_info(&self) -> CacheInfo {
        let listing = self.config.embeddings_dir.join("file_paths.json");
        let index_path = self.config.embeddings_dir.join("index.bin");

        let Ok(raw) = fs::read_to_string(&listing).await else {
            return CacheInfo::empty();
        };
        let Ok(paths) = serde_json::from_str::<Vec<PathBuf>>(&raw) else {
            return CacheInfo::empty();
        };
        let Ok(index_meta) = fs::metadata(&index_path).await else {
            return CacheInfo::empty();
        };

        let mut existing = 0usize;
        for path in &paths {
            if fs::try_exists(path).await.unwrap_or(false) {
                existing += 1;
            }
        }

        CacheInfo {
            cached_files: paths.len(),
            existing_files: Some(existing),
            missing_files: Some(paths.len() - existing),
            index_size_kb: (index_meta.len() as f64 / 1024.0).round() as u64,
            last_updated: index_meta.modified().ok().map(DateTime::<Utc>::from),
            status: if existing > 0 { "active" } else { "stale" },
        }
    }

    /// Create an embedding only when the sidecar listing does not already
    /// have one, reporting which of skip/create/recreate happened.
    pub async fn smart_create_embedding(
        &self,
        file_path: &str,
        force_recreate: bool,
    ) -> EngineResult<Value> {
        let has_existing = self.has_embedding(file_path).await;
        if has_existing && !force_recreate {
            return Ok(json!({
                "action": "skipped",
                "reason": "embedding_already_exists",
            }));
        }

        let mut created = self.create_file_embedding(file_path, force_recreate).await?;
        if let Value::Object(map) = &mut created {
            let action = if has_existing { "recreated" } else { "created" };
            map.insert("action".into(), Value::String(action.to_string()));
        }
        Ok(created)
    }

    /// Read, embed, and look up similar files in one pass.
    ///
    /// The read is required and fails the pipeline; embedding and
    /// similarity failures are folded into the result so a missing
    /// collaborator still produces a usable read.
    pub async fn process_file_complete(
        &self,
        file_path: &str,
    ) -> EngineResult<ProcessCompleteOutcome> {
        let started = Instant::now();
        let file_read = self.read_file_chunked(file_path, 1, None, None).await?;
        let read_time_ms = elapsed_ms(started);

        let embedding_started = Instant::now();
        let embedding_created = match self.create_file_embedding(file_path, false).await {
            Ok(value) => value,
            Err(e) => failure_value(&e.to_string()),
        };
        let embedding_time_ms = elapsed_ms(embedding_started);
        let embedding_ok = embedding_created
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut similar_files = None;
        let mut similarity_search_time_ms = None;
        if embedding_ok {
            let similar_started = Instant::now();
            let similar = match self.find_similar_files(file_path, 3).await {
                Ok(value) => value,
                Err(e) => failure_value(&e.to_string()),
            };
            similar_files = Some(similar);
            similarity_search_time_ms = Some(elapsed_ms(similar_started));
        }

        let similar_files_found = similar_files
            .as_ref()
            .and_then(|value| value.get("similar_files"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let total_time_ms = elapsed_ms(started);

        Ok(ProcessCompleteOutcome {
            summary: ProcessCompleteSummary {
                file_processed: file_path.to_string(),
                chunks_created: file_read.chunk_count,
                embedding_status: if embedding_ok { "created" } else { "failed" },
                similar_files_found,
                total_processing_time_ms: total_time_ms,
            },
            results: ProcessCompleteResults {
                file_read,
                embedding_created,
                similar_files,
                performance_stats: ProcessTimings {
                    read_time_ms,
                    embedding_time_ms,
                    similarity_search_time_ms,
                    total_time_ms,
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEmbeddingIndex;
    use crate::testing::{test_engine, write_file};
    use crate::EngineError;
    use std::path::Path;

    async fn write_sidecar(embeddings_dir: &Path, paths: &[PathBuf]) {
        fs::create_dir_all(embeddings_dir).await.unwrap();
        let listing = serde_json::to_string(paths).unwrap();
        fs::write(embeddings_dir.join("file_paths.json"), listing)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_has_embedding_checks_sidecar() {
        let (dir, engine) = test_engine();
        let tracked = write_file(&dir, "tracked.txt", "x").await;
        write_sidecar(&engine.config().embeddings_dir, &[tracked]).await;

        assert!(engine.has_embedding("tracked.txt").await);
        assert!(!engine.has_embedding("other.txt").await);
    }

    #[tokio::test]
    async fn test_has_embedding_without_sidecar() {
        let (_dir, engine) = test_engine();
        assert!(!engine.has_embedding("anything.txt").await);
    }

    #[tokio::test]
    async fn test_cache_info_empty_without_index() {
        let (_dir, engine) = test_engine();
        let info = engine.embedding_cache_info().await;
        assert_eq!(info.status, "empty");
        assert_eq!(info.cached_files, 0);
        assert!(info.last_updated.is_none());
    }

    #[tokio::test]
    async fn test_cache_info_counts_existing_and_missing() {
        let (dir, engine) = test_engine();
        let present = write_file(&dir, "present.txt", "x").await;
        let gone = dir.path().join("gone.txt");

        let embeddings_dir = engine.config().embeddings_dir.clone();
        write_sidecar(&embeddings_dir, &[present, gone]).await;
        fs::write(embeddings_dir.join("index.bin"), vec![0u8; 2048])
            .await
            .unwrap();

        let info = engine.embedding_cache_info().await;
        assert_eq!(info.status, "active");
        assert_eq!(info.cached_files, 2);
        assert_eq!(info.existing_files, Some(1));
        assert_eq!(info.missing_files, Some(1));
        assert_eq!(info.index_size_kb, 2);
        assert!(info.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_cache_info_stale_when_files_gone() {
        let (dir, engine) = test_engine();
        let gone = dir.path().join("gone.txt");

        let embeddings_dir = engine.config().embeddings_dir.clone();
        write_sidecar(&embeddings_dir, &[gone]).await;
        fs::write(embeddings_dir.join("index.bin"), b"idx").await.unwrap();

        let info = engine.embedding_cache_info().await;
        assert_eq!(info.status, "stale");
    }

    #[tokio::test]
    async fn test_smart_create_skips_existing() {
        let (dir, engine) = test_engine();
        let tracked = write_file(&dir, "tracked.txt", "x").await;
        write_sidecar(&engine.config().embeddings_dir, &[tracked]).await;

        let index = MockEmbeddingIndex::new();
        let engine = engine.with_embedding_index(Arc::new(index.clone()));

        let value = engine.smart_create_embedding("tracked.txt", false).await.unwrap();
        assert_eq!(value["action"], "skipped");
        assert_eq!(value["reason"], "embedding_already_exists");
        assert!(index.calls().is_empty());
    }

    #[tokio::test]
    async fn test_smart_create_creates_and_recreates() {
        let (dir, engine) = test_engine();
        let tracked = write_file(&dir, "tracked.txt", "x").await;

        let index = MockEmbeddingIndex::new();
        let engine = engine.with_embedding_index(Arc::new(index.clone()));

        let value = engine.smart_create_embedding("tracked.txt", false).await.unwrap();
        assert_eq!(value["action"], "created");
        assert_eq!(index.calls().len(), 1);

        write_sidecar(&engine.config().embeddings_dir, &[tracked]).await;
        let value = engine.smart_create_embedding("tracked.txt", true).await.unwrap();
        assert_eq!(value["action"], "recreated");
    }

    #[tokio::test]
    async fn test_embedding_ops_require_index() {
        let (_dir, engine) = test_engine();
        let err = engine.create_file_embedding("a.txt", false).await.unwrap_err();
        assert!(matches!(err, EngineError::Collaborator(_)));
    }

    #[tokio::test]
    async fn test_cleanup_wraps_collaborator_response() {
        let (_dir, engine) = test_engine();
        let index = MockEmbeddingIndex::new()
            .with_response("remove", json!({ "success": true, "removed": 1 }));
        let engine = engine.with_embedding_index(Arc::new(index));

        let value = engine.cleanup_file_embedding("a.txt").await.unwrap();
        assert!(value["message"].as_str().unwrap().contains("a.txt"));
        assert_eq!(value["embedding_cleanup"]["removed"], 1);
    }

    #[tokio::test]
    async fn test_process_file_complete_full_pipeline() {
        let (dir, engine) = test_engine();
        write_file(&dir, "file.txt", "line 1\nline 2").await;

        let index = MockEmbeddingIndex::new().with_response(
            "similar",
            json!({ "success": true, "similar_files": ["a.txt", "b.txt"] }),
        );
        let engine = engine.with_embedding_index(Arc::new(index));

        let outcome = engine.process_file_complete("file.txt").await.unwrap();

        assert_eq!(outcome.summary.embedding_status, "created");
        assert_eq!(outcome.summary.similar_files_found, 2);
        assert_eq!(outcome.summary.chunks_created, 1);
        assert!(outcome.results.similar_files.is_some());
        assert!(outcome
            .results
            .performance_stats
            .similarity_search_time_ms
            .is_some());
    }

    #[tokio::test]
    async fn test_process_file_complete_survives_missing_index() {
        let (dir, engine) = test_engine();
        write_file(&dir, "file.txt", "content").await;

        let outcome = engine.process_file_complete("file.txt").await.unwrap();

        assert_eq!(outcome.summary.embedding_status, "failed");
        assert_eq!(outcome.summary.similar_files_found, 0);
        assert!(outcome.results.similar_files.is_none());
        assert_eq!(outcome.results.embedding_created["success"], false);
    }

    #[tokio::test]
    async fn test_process_file_complete_requires_readable_file() {
        let (_dir, engine) = test_engine();
        let err = engine.process_file_complete("absent.txt").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
