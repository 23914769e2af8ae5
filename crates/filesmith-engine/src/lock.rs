//! Per-path serialization of mutating operations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Lock table keyed by resolved target path.
///
/// Mutations, creates, backups, and rollbacks acquire the lock for their
/// resolved path before touching the file, so concurrent requests for the
/// same path queue rather than interleave. Read-only operations do not
/// take locks. Entries are never removed; the table grows with the set of
/// distinct paths touched over the process lifetime.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: RwLock<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `path`, waiting if another holder is active.
    pub async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.write().await;
            Arc::clone(locks.entry(path.to_path_buf()).or_default())
        };
        lock.lock_owned().await
    }
}
