//! File creation.

use crate::accel::{AccelWriteRequest, WritePerformance};
use crate::{Engine, EngineError, EngineResult};
use filesmith_util::content_hash;
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

/// Result of a file creation.
#[derive(Debug, Serialize)]
pub struct CreateOutcome {
    pub file_path: String,
    pub file_size: u64,
    pub line_count: usize,
    pub file_hash: String,
    pub accelerator_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<WritePerformance>,
}

impl Engine {
    /// Create `file_path` with `content`, creating parent directories as
    /// needed. An existing file is an error unless `overwrite` is set.
    pub async fn create_file(
        &self,
        file_path: &str,
        content: &str,
        overwrite: bool,
    ) -> EngineResult<CreateOutcome> {
        let path = self.resolver.resolve(file_path);
        let _guard = self.locks.acquire(&path).await;

        if !overwrite && fs::try_exists(&path).await? {
            return Err(EngineError::already_exists(&path));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let (accelerator_used, performance) = self.write_target(&path, content).await?;

        info!(path = %path.display(), bytes = content.len(), "Created file");

        Ok(CreateOutcome {
            file_path: path.display().to_string(),
            file_size: content.len() as u64,
            line_count: content.split('\n').count(),
            file_hash: content_hash(content),
            accelerator_used,
            performance,
        })
    }

    /// Write `content` to `path`, preferring the accelerator and falling
    /// back to direct I/O on any collaborator failure.
    async fn write_target(
        &self,
        path: &Path,
        content: &str,
    ) -> EngineResult<(bool, Option<WritePerformance>)> {
        if let Some(accelerator) = &self.accelerator {
            let request = AccelWriteRequest {
                path: path.to_path_buf(),
                content: content.to_string(),
            };
            match accelerator.write(request).await {
                Ok(response) => {
                    return Ok((
                        true,
                        Some(WritePerformance {
                            write_time_us: response.write_time_us,
                            performance_mb_per_sec: response.performance_mb_per_sec,
                        }),
                    ));
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Accelerator write failed, falling back to direct I/O"
                    );
                }
            }
        }
        fs::write(path, content).await?;
        Ok((false, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAccelerator;
    use crate::testing::test_engine;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_writes_file_and_parents() {
        let (dir, engine) = test_engine();

        let outcome = engine
            .create_file("sub/deep/new.txt", "a\nb", false)
            .await
            .unwrap();

        assert_eq!(outcome.file_size, 3);
        assert_eq!(outcome.line_count, 2);
        assert_eq!(outcome.file_hash, content_hash("a\nb"));
        assert!(!outcome.accelerator_used);

        let written = fs::read_to_string(dir.path().join("sub/deep/new.txt"))
            .await
            .unwrap();
        assert_eq!(written, "a\nb");
    }

    #[tokio::test]
    async fn test_create_rejects_existing_without_overwrite() {
        let (dir, engine) = test_engine();
        fs::write(dir.path().join("file.txt"), "old").await.unwrap();

        let err = engine.create_file("file.txt", "new", false).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyExists(_)));

        engine.create_file("file.txt", "new", true).await.unwrap();
        let written = fs::read_to_string(dir.path().join("file.txt")).await.unwrap();
        assert_eq!(written, "new");
    }

    #[tokio::test]
    async fn test_create_through_accelerator() {
        let (dir, engine) = test_engine();
        let accel = MockAccelerator::new();
        let engine = engine.with_accelerator(Arc::new(accel.clone()));

        let outcome = engine.create_file("fast.txt", "content", false).await.unwrap();

        assert!(outcome.accelerator_used);
        assert!(outcome.performance.is_some());
        assert_eq!(accel.writes().len(), 1);

        let written = fs::read_to_string(dir.path().join("fast.txt")).await.unwrap();
        assert_eq!(written, "content");
    }

    #[tokio::test]
    async fn test_create_falls_back_when_accelerator_fails() {
        let (dir, engine) = test_engine();
        let accel = MockAccelerator::new().with_write_error("disk full");
        let engine = engine.with_accelerator(Arc::new(accel));

        let outcome = engine.create_file("slow.txt", "content", false).await.unwrap();

        assert!(!outcome.accelerator_used);
        let written = fs::read_to_string(dir.path().join("slow.txt")).await.unwrap();
        assert_eq!(written, "content");
    }
}
