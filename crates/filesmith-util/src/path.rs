//! Path resolution against a project root.

use std::path::{Path, PathBuf};

/// Resolves possibly-relative paths against a project root fixed at startup.
///
/// Absolute paths pass through unchanged; relative paths are joined onto the
/// root and structurally normalized. Resolution never touches the filesystem,
/// so a resolved path is not guaranteed to exist.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The project root this resolver was built with.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` to an absolute path.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            normalize(&self.root.join(path))
        }
    }
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this doesn't require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                result.pop();
            }
            std::path::Component::CurDir => {
                // Skip `.`
            }
            _ => {
                result.push(component);
            }
        }
    }

    result
}
