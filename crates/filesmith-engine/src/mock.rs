//! Mock collaborators for testing.
//!
//! Both mocks share their state through `Arc<Mutex<..>>` so a clone kept
//! by the test observes calls made through the engine.

use crate::accel::{
    AccelReadRequest, AccelReadResponse, AccelWriteRequest, AccelWriteResponse, FileAccelerator,
};
use crate::embed::{EmbedCreateRequest, EmbedRemoveRequest, EmbeddingIndex, SimilarRequest};
use crate::{EngineError, EngineResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Mock accelerator for testing.
///
/// Reads must be scripted per path; unscripted reads fail so the engine
/// exercises its direct-I/O fallback. Writes succeed by default and are
/// performed for real so the files exist for later assertions.
#[derive(Debug, Clone, Default)]
pub struct MockAccelerator {
    reads: Arc<Mutex<HashMap<PathBuf, Result<String, String>>>>,
    write_error: Arc<Mutex<Option<String>>>,
    writes: Arc<Mutex<Vec<AccelWriteRequest>>>,
}

impl MockAccelerator {
    /// Create a mock with no scripted reads and succeeding writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful read for `path`.
    pub fn with_read(self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.reads
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), Ok(content.into()));
        self
    }

    /// Script a failing read for `path`.
    pub fn with_read_error(self, path: impl AsRef<Path>, error: impl Into<String>) -> Self {
        self.reads
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), Err(error.into()));
        self
    }

    /// Make every write fail with `error`.
    pub fn with_write_error(self, error: impl Into<String>) -> Self {
        *self.write_error.lock().unwrap() = Some(error.into());
        self
    }

    /// Write requests received so far, including failed ones.
    pub fn writes(&self) -> Vec<AccelWriteRequest> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileAccelerator for MockAccelerator {
    async fn read(&self, request: AccelReadRequest) -> EngineResult<AccelReadResponse> {
        let scripted = self.reads.lock().unwrap().get(&request.path).cloned();
        match scripted {
            Some(Ok(content)) => Ok(AccelReadResponse {
                file_size: content.len() as u64,
                content,
                read_time_us: 42,
                performance_mb_per_sec: 1000.0,
            }),
            Some(Err(error)) => Err(EngineError::collaborator(error)),
            None => Err(EngineError::collaborator(format!(
                "no scripted read for {}",
                request.path.display()
            ))),
        }
    }

    async fn write(&self, request: AccelWriteRequest) -> EngineResult<AccelWriteResponse> {
        self.writes.lock().unwrap().push(request.clone());
        if let Some(error) = self.write_error.lock().unwrap().clone() {
            return Err(EngineError::collaborator(error));
        }
        std::fs::write(&request.path, &request.content)?;
        Ok(AccelWriteResponse {
            file_size: request.content.len() as u64,
            write_time_us: 42,
            performance_mb_per_sec: 1000.0,
        })
    }
}

/// Mock embedding index for testing.
///
/// Responses are scripted per operation name (`create`, `similar`,
/// `remove`); unscripted operations return a bare success payload.
#[derive(Debug, Clone, Default)]
pub struct MockEmbeddingIndex {
    responses: Arc<Mutex<HashMap<String, Result<Value, String>>>>,
    calls: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl MockEmbeddingIndex {
    /// Create a mock where every operation succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful response for `operation`.
    pub fn with_response(self, operation: impl Into<String>, response: Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(operation.into(), Ok(response));
        self
    }

    /// Script a failure for `operation`.
    pub fn with_error(self, operation: impl Into<String>, error: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(operation.into(), Err(error.into()));
        self
    }

    /// Operations received so far as `(operation, path)` pairs.
    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, operation: &str, path: &Path) -> EngineResult<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), path.to_path_buf()));
        match self.responses.lock().unwrap().get(operation) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(error)) => Err(EngineError::collaborator(error.clone())),
            None => Ok(json!({ "success": true })),
        }
    }
}

#[async_trait]
impl EmbeddingIndex for MockEmbeddingIndex {
    async fn create(&self, request: EmbedCreateRequest) -> EngineResult<Value> {
        self.respond("create", &request.path)
    }

    async fn find_similar(&self, request: SimilarRequest) -> EngineResult<Value> {
        self.respond("similar", &request.path)
    }

    async fn remove(&self, request: EmbedRemoveRequest) -> EngineResult<Value> {
        self.respond("remove", &request.path)
    }
}
