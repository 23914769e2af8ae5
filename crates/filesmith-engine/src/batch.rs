//! Sequential batch execution.
//!
//! Both batch forms share one rule: an item's failure is attached to
//! that item and the batch keeps going. Nothing here returns an error
//! at the batch level.

use crate::analyze::CompressionLevel;
use crate::scan::StructureFilter;
use crate::{elapsed_ms, Engine, EngineError, EngineResult, MutationError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tokio::fs;
use tracing::info;

/// One filesystem batch descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FsOperation {
    Copy { source: String, destination: String },
    Move { source: String, destination: String },
    Delete { target: String },
    MakeDirectory { path: String },
}

/// One executed batch item. `operation` echoes the raw descriptor,
/// parseable or not.
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub operation: Value,
    pub result: Value,
    pub processing_time_ms: u64,
}

/// Result of a filesystem batch.
#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub total_operations: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    pub results: Vec<BatchItem>,
    pub total_processing_time_ms: u64,
}

/// Shared options for a multi-file batch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MultiFileOptions {
    pub chunk_size: Option<usize>,
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,
    pub structure_type: StructureFilter,
    pub force_recreate: bool,
    pub top_k: Option<usize>,
    pub compression_level: CompressionLevel,
}

/// One processed file in a multi-file batch.
#[derive(Debug, Serialize)]
pub struct MultiFileItem {
    pub file_path: String,
    pub operation_type: String,
    pub result: Value,
    pub processing_time_ms: u64,
}

/// Result of a multi-file batch.
#[derive(Debug, Serialize)]
pub struct MultiFileOutcome {
    pub total_files: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    pub total_processing_time_ms: u64,
    pub average_time_per_file_ms: f64,
    pub expired_records_removed: usize,
    pub results: Vec<MultiFileItem>,
}

/// The closed set of per-file operations a multi-file batch can run.
#[derive(Debug, Clone, Copy)]
enum MultiFileOp {
    ReadChunked,
    FindStructures,
    Backup,
    CreateEmbedding,
    FindSimilar,
    ProcessComplete,
    ValidateSyntax,
    CompressContent,
    Benchmark,
    CleanupEmbedding,
}

impl FromStr for MultiFileOp {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "read_chunked" => Self::ReadChunked,
            "find_structures" => Self::FindStructures,
            "backup" => Self::Backup,
            "create_embedding" => Self::CreateEmbedding,
            "find_similar" => Self::FindSimilar,
            "process_complete" => Self::ProcessComplete,
            "validate_syntax" => Self::ValidateSyntax,
            "compress_content" => Self::CompressContent,
            "benchmark" => Self::Benchmark,
            "cleanup_embedding" => Self::CleanupEmbedding,
            _ => return Err(EngineError::unknown_operation(s)),
        })
    }
}

pub(crate) fn failure_value(message: &str) -> Value {
    json!({ "success": false, "error": message })
}

/// Serialize an outcome and merge `success: true` into it.
fn success_value<T: Serialize>(outcome: &T) -> Value {
    match serde_json::to_value(outcome) {
        Ok(Value::Object(mut map)) => {
            map.insert("success".into(), Value::Bool(true));
            Value::Object(map)
        }
        Ok(other) => json!({ "success": true, "result": other }),
        Err(e) => failure_value(&format!("Result serialization failed: {e}")),
    }
}

fn engine_value<T: Serialize>(result: EngineResult<T>) -> Value {
    match result {
        Ok(outcome) => success_value(&outcome),
        Err(e) => failure_value(&e.to_string()),
    }
}

fn mutation_value<T: Serialize>(result: Result<T, MutationError>) -> Value {
    match result {
        Ok(outcome) => success_value(&outcome),
        Err(e) => {
            let mut value = failure_value(&e.to_string());
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

fn item_succeeded(result: &Value) -> bool {
    result
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn map_missing(e: std::io::Error, path: &Path) -> EngineError {
    if e.kind() == std::io::ErrorKind::NotFound {
        EngineError::not_found(path)
    } else {
        e.into()
    }
}

impl Engine {
    /// Run an ordered list of filesystem descriptors sequentially.
    ///
    /// Each raw descriptor is parsed individually, so an unrecognized or
    /// malformed item is reported as that item's failure and the batch
    /// continues.
    pub async fn batch_operations(&self, operations: &[Value]) -> BatchOutcome {
        let started = Instant::now();
        let mut results = Vec::with_capacity(operations.len());
        let mut successful_operations = 0;

        for raw in operations {
            let item_started = Instant::now();
            let result = match serde_json::from_value::<FsOperation>(raw.clone()) {
                Ok(operation) => match self.execute_fs_operation(&operation).await {
                    Ok(payload) => success_value(&payload),
                    Err(e) => failure_value(&e.to_string()),
                },
                Err(e) => failure_value(&format!("Invalid operation: {e}")),
            };

            if item_succeeded(&result) {
                successful_operations += 1;
            }
            results.push(BatchItem {
                operation: raw.clone(),
                result,
                processing_time_ms: elapsed_ms(item_started),
            });
        }

        let total_operations = operations.len();
        info!(
            total = total_operations,
            successful = successful_operations,
            "Batch finished"
        );

        BatchOutcome {
            total_operations,
            successful_operations,
            failed_operations: total_operations - successful_operations,
            results,
            total_processing_time_ms: elapsed_ms(started),
        }
    }

    async fn execute_fs_operation(&self, operation: &FsOperation) -> EngineResult<Value> {
        Ok(match operation {
            FsOperation::Copy {
                source,
                destination,
            } => {
                let from = self.resolver.resolve(source);
                let to = self.resolver.resolve(destination);
                let content = fs::read(&from).await.map_err(|e| map_missing(e, &from))?;
                fs::write(&to, &content).await?;
                json!({ "source": source, "destination": destination, "size": content.len() })
            }
            FsOperation::Move {
                source,
                destination,
            } => {
                let from = self.resolver.resolve(source);
                let to = self.resolver.resolve(destination);
                fs::rename(&from, &to)
                    .await
                    .map_err(|e| map_missing(e, &from))?;
                json!({ "source": source, "destination": destination })
            }
            FsOperation::Delete { target } => {
                let path = self.resolver.resolve(target);
                fs::remove_file(&path)
                    .await
                    .map_err(|e| map_missing(e, &path))?;
                json!({ "deleted": target })
            }
            FsOperation::MakeDirectory { path } => {
                let dir = self.resolver.resolve(path);
                fs::create_dir_all(&dir).await?;
                json!({ "created": path })
            }
        })
    }

    /// Run one operation over an ordered list of files.
    ///
    /// Expired history records are swept first; an unknown selector
    /// yields a failure item for every path instead of a batch error.
    pub async fn process_multiple_files(
        &self,
        file_paths: &[String],
        operation_type: &str,
        options: &MultiFileOptions,
    ) -> MultiFileOutcome {
        let started = Instant::now();
        let expired_records_removed = self
            .history
            .sweep_expired(self.config.backup_max_age_hours)
            .await;

        let parsed = MultiFileOp::from_str(operation_type);
        let mut results = Vec::with_capacity(file_paths.len());
        let mut successful_operations = 0;

        for file_path in file_paths {
            let item_started = Instant::now();
            let result = match parsed {
                Ok(op) => self.run_multi_op(op, file_path, options).await,
                Err(ref e) => failure_value(&e.to_string()),
            };

            if item_succeeded(&result) {
                successful_operations += 1;
            }
            results.push(MultiFileItem {
                file_path: file_path.clone(),
                operation_type: operation_type.to_string(),
                result,
                processing_time_ms: elapsed_ms(item_started),
            });
        }

        let total_files = file_paths.len();
        let total_processing_time_ms = elapsed_ms(started);
        let average_time_per_file_ms = if total_files > 0 {
            total_processing_time_ms as f64 / total_files as f64
        } else {
            0.0
        };

        info!(
            operation = operation_type,
            total = total_files,
            successful = successful_operations,
            "Multi-file batch finished"
        );

        MultiFileOutcome {
            total_files,
            successful_operations,
            failed_operations: total_files - successful_operations,
            total_processing_time_ms,
            average_time_per_file_ms,
            expired_records_removed,
            results,
        }
    }

    async fn run_multi_op(
        &self,
        op: MultiFileOp,
        file_path: &str,
        options: &MultiFileOptions,
    ) -> Value {
        match op {
            MultiFileOp::ReadChunked => engine_value(
                self.read_file_chunked(
                    file_path,
                    options.start_line.unwrap_or(1),
                    options.end_line,
                    options.chunk_size,
                )
                .await,
            ),
            MultiFileOp::FindStructures => {
                engine_value(self.find_code_structures(file_path, options.structure_type).await)
            }
            MultiFileOp::Backup => mutation_value(self.backup_file(file_path).await),
            MultiFileOp::CreateEmbedding => {
                engine_value(self.create_file_embedding(file_path, options.force_recreate).await)
            }
            MultiFileOp::FindSimilar => {
                engine_value(self.find_similar_files(file_path, options.top_k.unwrap_or(5)).await)
            }
            MultiFileOp::ProcessComplete => {
                engine_value(self.process_file_complete(file_path).await)
            }
            MultiFileOp::ValidateSyntax => engine_value(self.validate_syntax(file_path).await),
            MultiFileOp::CompressContent => {
                engine_value(self.compress_content(file_path, options.compression_level).await)
            }
            MultiFileOp::Benchmark => engine_value(self.benchmark_read(file_path).await),
            MultiFileOp::CleanupEmbedding => {
                engine_value(self.cleanup_file_embedding(file_path).await)
            }
        }
    }
}
