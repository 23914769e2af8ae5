//! Request dispatch and the JSON result envelope.
//!
//! Every response is a single JSON object carrying `success`. Successful
//! outcomes are serialized and the flag merged in; failures carry the
//! error message, and mutation failures additionally the operation id so
//! the caller can correlate logs. [`Service::handle_line`] never fails,
//! so the serve loop never has to tear down over a bad request.

use crate::action::Request;
use filesmith_engine::{Engine, EngineResult, MutationError};
use filesmith_history::OperationId;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Stateless dispatcher from parsed requests to engine calls.
#[derive(Clone)]
pub struct Service {
    engine: Arc<Engine>,
}

impl Service {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Handle one raw request line.
    pub async fn handle_line(&self, line: &str) -> Value {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                debug!(action = request.action_name(), "Dispatching request");
                self.dispatch(request).await
            }
            Err(e) => failure(&format!("Invalid request: {e}")),
        }
    }

    async fn dispatch(&self, request: Request) -> Value {
        match request {
            Request::CreateFile {
                file_path,
                new_content,
                overwrite,
            } => engine_result(
                self.engine
                    .create_file(&file_path, &new_content, overwrite)
                    .await,
            ),
            Request::ReadFileChunked {
                file_path,
                start_line,
                end_line,
                chunk_size,
            } => engine_result(
                self.engine
                    .read_file_chunked(&file_path, start_line, end_line, chunk_size)
                    .await,
            ),
            Request::ReplaceLines {
                file_path,
                start_line,
                end_line,
                new_content,
                backup,
            } => mutation_result(
                self.engine
                    .replace_lines(&file_path, start_line, end_line, new_content, backup)
                    .await,
            ),
            Request::DeleteLines {
                file_path,
                start_line,
                end_line,
                backup,
            } => mutation_result(
                self.engine
                    .delete_lines(&file_path, start_line, end_line, backup)
                    .await,
            ),
            Request::InsertLines {
                file_path,
                start_line,
                new_content,
                backup,
            } => mutation_result(
                self.engine
                    .insert_lines(&file_path, start_line, new_content, backup)
                    .await,
            ),
            Request::FindCodeStructures {
                file_path,
                structure_type,
            } => engine_result(
                self.engine
                    .find_code_structures(&file_path, structure_type)
                    .await,
            ),
            Request::FindAndReplace {
                file_path,
                search_pattern,
                replacement,
                use_regex,
                backup,
            } => mutation_result(
                self.engine
                    .find_and_replace(&file_path, &search_pattern, &replacement, use_regex, backup)
                    .await,
            ),
            Request::GenerateDiff {
                file_path,
                file_path_2,
            } => engine_result(self.engine.generate_diff(&file_path, &file_path_2).await),
            Request::BatchOperations { operations } => {
                success(&self.engine.batch_operations(&operations).await)
            }
            Request::ProcessMultipleFiles {
                file_paths,
                operation_type,
                options,
            } => success(
                &self
                    .engine
                    .process_multiple_files(&file_paths, &operation_type, &options)
                    .await,
            ),
            Request::RollbackOperation { operation_id } => {
                let id = OperationId::from_string(operation_id);
                engine_result(self.engine.rollback_operation(&id).await)
            }
            Request::GetPerformanceStats => success(&self.engine.performance_stats().await),
            Request::ProcessFileComplete { file_path } => {
                engine_result(self.engine.process_file_complete(&file_path).await)
            }
            Request::SmartCreateEmbedding { file_path, force } => {
                engine_result(self.engine.smart_create_embedding(&file_path, force).await)
            }
            Request::HasEmbedding { file_path } => {
                let has_embedding = self.engine.has_embedding(&file_path).await;
                json!({
                    "success": true,
                    "file_path": file_path,
                    "has_embedding": has_embedding,
                    "check_time_ms": "<1ms",
                })
            }
            Request::GetEmbeddingCacheInfo => success(&self.engine.embedding_cache_info().await),
            Request::CleanupFileEmbedding { file_path } => {
                engine_result(self.engine.cleanup_file_embedding(&file_path).await)
            }
        }
    }
}

fn failure(message: &str) -> Value {
    json!({ "success": false, "error": message })
}

/// Serialize an outcome and merge `success: true` into it. Non-object
/// payloads are wrapped under `result` so the flag always has a home.
fn success<T: Serialize>(outcome: &T) -> Value {
    match serde_json::to_value(outcome) {
        Ok(Value::Object(mut map)) => {
            map.insert("success".into(), Value::Bool(true));
            Value::Object(map)
        }
        Ok(other) => json!({ "success": true, "result": other }),
        Err(e) => failure(&format!("JSON error: {e}")),
    }
}

fn engine_result<T: Serialize>(result: EngineResult<T>) -> Value {
    match result {
        Ok(outcome) => success(&outcome),
        Err(e) => failure(&e.to_string()),
    }
}

fn mutation_result<T: Serialize>(result: Result<T, MutationError>) -> Value {
    match result {
        Ok(outcome) => success(&outcome),
        Err(e) => {
            let mut value = failure(&e.to_string());
            if let Value::Object(map) = &mut value {
                map.insert(
                    "operation_id".into(),
                    Value::String(e.operation_id.to_string()),
                );
            }
            value
        }
    }
}
