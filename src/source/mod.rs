//! Source collaborators
//!
//! `SourceStore` reads asset contents and modification times, and
//! `FileResolver` expands wildcard source specifications into concrete
//! paths. Both are traits so hosts can back them with something other than
//! the local filesystem.

pub mod resolver;

pub use resolver::{FileResolver, GlobResolver};

use crate::error::{PressError, PressResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// Read access to asset sources
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Check whether a source exists
    async fn exists(&self, path: &Path) -> bool;

    /// Read the full contents of a source
    async fn read_contents(&self, path: &Path) -> PressResult<Vec<u8>>;

    /// Last modification time of a source
    async fn last_modified(&self, path: &Path) -> PressResult<SystemTime>;

    /// Whether `path` resolves to a location inside `dir`, following links
    async fn contains(&self, dir: &Path, path: &Path) -> bool;
}

/// Filesystem-backed source store rooted at the project directory
#[derive(Debug, Clone)]
pub struct FsSourceStore {
    root: PathBuf,
}

impl FsSourceStore {
    /// Create a store resolving relative paths against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl SourceStore for FsSourceStore {
    async fn exists(&self, path: &Path) -> bool {
        fs::metadata(self.full_path(path))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn read_contents(&self, path: &Path) -> PressResult<Vec<u8>> {
        let full = self.full_path(path);
        fs::read(&full)
            .await
            .map_err(|e| PressError::io(format!("reading source {}", full.display()), e))
    }

    async fn last_modified(&self, path: &Path) -> PressResult<SystemTime> {
        let full = self.full_path(path);
        let metadata = fs::metadata(&full)
            .await
            .map_err(|e| PressError::io(format!("reading metadata of {}", full.display()), e))?;
        metadata
            .modified()
            .map_err(|e| PressError::io(format!("reading mtime of {}", full.display()), e))
    }

    async fn contains(&self, dir: &Path, path: &Path) -> bool {
        let (Ok(dir), Ok(path)) = (
            fs::canonicalize(self.full_path(dir)).await,
            fs::canonicalize(self.full_path(path)).await,
        ) else {
            return false;
        };
        path.starts_with(&dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn exists_only_for_files() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("js")).unwrap();
        std::fs::write(temp.path().join("js/app.js"), "var a;").unwrap();
        let store = FsSourceStore::new(temp.path());

        assert!(store.exists(Path::new("js/app.js")).await);
        assert!(!store.exists(Path::new("js")).await);
        assert!(!store.exists(Path::new("js/missing.js")).await);
    }

    #[tokio::test]
    async fn read_contents_and_mtime() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("app.css"), "a { color: red }").unwrap();
        let store = FsSourceStore::new(temp.path());

        let contents = store.read_contents(Path::new("app.css")).await.unwrap();
        assert_eq!(contents, b"a { color: red }");
        assert!(store.last_modified(Path::new("app.css")).await.is_ok());
    }

    #[tokio::test]
    async fn read_missing_errors() {
        let temp = TempDir::new().unwrap();
        let store = FsSourceStore::new(temp.path());
        let err = store
            .read_contents(Path::new("nope.js"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reading source"));
    }

    #[tokio::test]
    async fn contains_follows_canonical_paths() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("js/lib")).unwrap();
        std::fs::write(temp.path().join("js/lib/a.js"), "").unwrap();
        std::fs::write(temp.path().join("outside.js"), "").unwrap();
        let store = FsSourceStore::new(temp.path());
        let dir = Path::new("js");

        assert!(store.contains(dir, Path::new("js/lib/a.js")).await);
        assert!(store.contains(dir, Path::new("js/lib/../lib/a.js")).await);
        assert!(!store.contains(dir, Path::new("js/../outside.js")).await);
        assert!(!store.contains(dir, Path::new("js/missing.js")).await);
    }
}
