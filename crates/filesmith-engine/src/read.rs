//! Chunked file reading.

use crate::accel::{AccelReadRequest, ReadPerformance};
use crate::{Engine, EngineError, EngineResult};
use filesmith_util::content_hash;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::warn;

/// Read a file that must already exist, mapping the missing-file case to
/// [`EngineError::NotFound`].
pub(crate) async fn read_existing(path: &Path) -> EngineResult<String> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(EngineError::not_found(path)),
        Err(e) => Err(e.into()),
    }
}

/// One chunk of a chunked read.
#[derive(Debug, Clone, Serialize)]
pub struct ReadChunk {
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub line_count: usize,
}

/// Result of a chunked read.
#[derive(Debug, Serialize)]
pub struct ChunkedReadOutcome {
    pub file_path: String,
    pub total_lines: usize,
    pub requested_range: String,
    pub chunks: Vec<ReadChunk>,
    pub chunk_count: usize,
    pub file_hash: String,
    pub accelerator_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<ReadPerformance>,
}

impl Engine {
    /// Read the whole file, preferring the accelerator and falling back to
    /// direct I/O on any collaborator failure.
    pub(crate) async fn read_content(
        &self,
        path: &Path,
    ) -> EngineResult<(String, Option<ReadPerformance>)> {
        if let Some(accelerator) = &self.accelerator {
            let request = AccelReadRequest {
                path: path.to_path_buf(),
            };
            match accelerator.read(request).await {
                Ok(response) => {
                    return Ok((
                        response.content,
                        Some(ReadPerformance {
                            read_time_us: response.read_time_us,
                            performance_mb_per_sec: response.performance_mb_per_sec,
                        }),
                    ));
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Accelerator read failed, falling back to direct I/O"
                    );
                }
            }
        }
        Ok((read_existing(path).await?, None))
    }

    /// Read `file_path` in line chunks.
    ///
    /// `start_line` is clamped up to 1 and `end_line` down to the file
    /// length; a start beyond the last line is an invalid range.
    pub async fn read_file_chunked(
        &self,
        file_path: &str,
        start_line: usize,
        end_line: Option<usize>,
        chunk_size: Option<usize>,
    ) -> EngineResult<ChunkedReadOutcome> {
        let path = self.resolver.resolve(file_path);
        let chunk_size = chunk_size.unwrap_or(self.config.default_chunk_size).max(1);

        let (content, performance) = self.read_content(&path).await?;
        let accelerator_used = performance.is_some();

        let lines: Vec<&str> = content.split('\n').collect();
        let total_lines = lines.len();

        let actual_start = start_line.max(1);
        let actual_end = end_line.map_or(total_lines, |end| end.min(total_lines));

        if actual_start > total_lines {
            return Err(EngineError::invalid_range(format!(
                "start line {actual_start} exceeds file length {total_lines}"
            )));
        }

        let requested: &[&str] = if actual_end >= actual_start {
            &lines[actual_start - 1..actual_end]
        } else {
            &[]
        };

        let mut chunks = Vec::new();
        for (index, chunk) in requested.chunks(chunk_size).enumerate() {
            let chunk_start = actual_start + index * chunk_size;
            chunks.push(ReadChunk {
                start_line: chunk_start,
                end_line: chunk_start + chunk.len() - 1,
                content: chunk.join("\n"),
                line_count: chunk.len(),
            });
        }

        let chunk_count = chunks.len();
        Ok(ChunkedReadOutcome {
            file_path: path.display().to_string(),
            total_lines,
            requested_range: format!("{actual_start}-{actual_end}"),
            chunks,
            chunk_count,
            file_hash: content_hash(&content),
            accelerator_used,
            performance,
        })
    }
}
