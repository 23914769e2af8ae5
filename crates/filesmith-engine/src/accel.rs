//! File accelerator collaborator.
//!
//! The accelerator is an external binary offering fast whole-file reads
//! and writes. It sits behind [`FileAccelerator`] so the engine can fall
//! back to direct I/O when a call fails and tests can script responses.

use crate::collab;
use crate::read::read_existing;
use crate::{Engine, EngineResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::warn;

/// Read request for the accelerator.
#[derive(Debug, Clone)]
pub struct AccelReadRequest {
    pub path: PathBuf,
}

/// Write request for the accelerator.
#[derive(Debug, Clone)]
pub struct AccelWriteRequest {
    pub path: PathBuf,
    pub content: String,
}

/// Payload of a successful accelerator read.
#[derive(Debug, Clone, Deserialize)]
pub struct AccelReadResponse {
    pub content: String,
    pub file_size: u64,
    #[serde(default)]
    pub read_time_us: u64,
    #[serde(default)]
    pub performance_mb_per_sec: f64,
}

/// Payload of a successful accelerator write.
#[derive(Debug, Clone, Deserialize)]
pub struct AccelWriteResponse {
    pub file_size: u64,
    #[serde(default)]
    pub write_time_us: u64,
    #[serde(default)]
    pub performance_mb_per_sec: f64,
}

/// Read timing surfaced in results when the accelerator served the read.
#[derive(Debug, Clone, Serialize)]
pub struct ReadPerformance {
    pub read_time_us: u64,
    pub performance_mb_per_sec: f64,
}

/// Write timing surfaced in results when the accelerator served the write.
#[derive(Debug, Clone, Serialize)]
pub struct WritePerformance {
    pub write_time_us: u64,
    pub performance_mb_per_sec: f64,
}

/// Narrow interface to the file accelerator.
///
/// Implementations must tolerate concurrent calls. Callers treat every
/// error as recoverable and fall back to direct I/O.
#[async_trait]
pub trait FileAccelerator: Send + Sync {
    async fn read(&self, request: AccelReadRequest) -> EngineResult<AccelReadResponse>;
    async fn write(&self, request: AccelWriteRequest) -> EngineResult<AccelWriteResponse>;
}

/// Accelerator client backed by an external binary.
#[derive(Debug, Clone)]
pub struct CommandAccelerator {
    binary: PathBuf,
    timeout: Duration,
}

impl CommandAccelerator {
    pub fn new(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }
}

#[async_trait]
impl FileAccelerator for CommandAccelerator {
    async fn read(&self, request: AccelReadRequest) -> EngineResult<AccelReadResponse> {
        let params = json!({ "filepath": request.path.display().to_string() });
        collab::invoke(&self.binary, "read", &params, self.timeout).await
    }

    async fn write(&self, request: AccelWriteRequest) -> EngineResult<AccelWriteResponse> {
        let params = json!({
            "filepath": request.path.display().to_string(),
            "content": request.content,
        });
        collab::invoke(&self.binary, "write", &params, self.timeout).await
    }
}

/// Result of timing a direct read against an accelerator read.
#[derive(Debug, Serialize)]
pub struct BenchmarkOutcome {
    pub file_path: String,
    pub file_size: usize,
    pub benchmark: BenchmarkReport,
}

#[derive(Debug, Serialize)]
pub struct BenchmarkReport {
    pub direct_read_ms: f64,
    pub accelerator: AcceleratorBench,
    pub speedup: f64,
}

#[derive(Debug, Serialize)]
pub struct AcceleratorBench {
    pub available: bool,
    pub read_ms: f64,
    pub performance_mb_per_sec: f64,
}

impl Engine {
    /// Time a direct full read against an accelerator read of the same
    /// file. The comparison is skipped when no accelerator is configured.
    pub async fn benchmark_read(&self, file_path: &str) -> EngineResult<BenchmarkOutcome> {
        let path = self.resolver.resolve(file_path);

        let direct_started = Instant::now();
        let content = read_existing(&path).await?;
        let direct_read_ms = direct_started.elapsed().as_secs_f64() * 1000.0;

        let mut accelerator = AcceleratorBench {
            available: false,
            read_ms: 0.0,
            performance_mb_per_sec: 0.0,
        };
        let mut speedup = 0.0;

        if let Some(client) = &self.accelerator {
            accelerator.available = true;
            let accel_started = Instant::now();
            match client.read(AccelReadRequest { path: path.clone() }).await {
                Ok(response) => {
                    accelerator.read_ms = accel_started.elapsed().as_secs_f64() * 1000.0;
                    accelerator.performance_mb_per_sec = response.performance_mb_per_sec;
                    if accelerator.read_ms > 0.0 {
                        speedup = direct_read_ms / accelerator.read_ms;
                    }
                }
                Err(e) => {
                    accelerator.read_ms = accel_started.elapsed().as_secs_f64() * 1000.0;
                    warn!(path = %path.display(), error = %e, "Accelerator benchmark read failed");
                }
            }
        }

        Ok(BenchmarkOutcome {
            file_path: path.display().to_string(),
            file_size: content.len(),
            benchmark: BenchmarkReport {
                direct_read_ms,
                accelerator,
                speedup,
            },
        })
    }
}
