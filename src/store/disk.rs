//! Persisted artifact backend
//!
//! Each artifact is written as two files under the artifact directory: the
//! raw bytes, named by the escaped key, and a `.meta.json` sidecar. The
//! sidecar is written last, so an artifact without one is treated as absent.
//! Both files are replaced by rename, so rewriting a key never exposes a
//! truncated artifact.

use super::{Artifact, ArtifactBackend, ArtifactMeta};
use crate::error::{PressError, PressResult};
use crate::key::{self, CacheKey};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

const META_SUFFIX: &str = ".meta.json";
const TEMP_SUFFIX: &str = ".tmp";

/// Artifact backend writing to a directory
#[derive(Debug, Clone)]
pub struct DiskBackend {
    dir: PathBuf,
}

impl DiskBackend {
    /// Create a backend rooted at `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Artifact directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn data_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key::escape(key))
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}{}", key::escape(key), META_SUFFIX))
    }

    async fn remove_files(&self, key: &CacheKey) -> PressResult<bool> {
        let mut removed = false;
        for path in [self.meta_path(key), self.data_path(key)] {
            match fs::remove_file(&path).await {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(PressError::io(
                        format!("removing artifact file {}", path.display()),
                        e,
                    ))
                }
            }
        }
        Ok(removed)
    }

    async fn read_meta(&self, key: &CacheKey) -> PressResult<Option<ArtifactMeta>> {
        let path = self.meta_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PressError::io(
                    format!("reading artifact metadata {}", path.display()),
                    e,
                ))
            }
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn meta_files(&self) -> PressResult<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PressError::io("reading artifact directory", e)),
        };

        let mut metas = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PressError::io("reading artifact entry", e))?
        {
            let path = entry.path();
            if path.to_string_lossy().ends_with(META_SUFFIX) {
                metas.push(path);
            }
        }
        Ok(metas)
    }
}

/// Write `bytes` to a sibling temp file, then rename it over `path`
///
/// Readers see either the old file or the new one, never a partial write.
async fn write_replacing(path: &Path, bytes: &[u8]) -> PressResult<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(TEMP_SUFFIX);
    let temp = PathBuf::from(temp);

    fs::write(&temp, bytes)
        .await
        .map_err(|e| PressError::io(format!("writing {}", temp.display()), e))?;
    fs::rename(&temp, path)
        .await
        .map_err(|e| PressError::io(format!("replacing {}", path.display()), e))
}

#[async_trait]
impl ArtifactBackend for DiskBackend {
    async fn get(&self, key: &CacheKey) -> PressResult<Option<Arc<Artifact>>> {
        let Some(meta) = self.read_meta(key).await? else {
            return Ok(None);
        };

        if meta.expires_at.is_some_and(|at| Utc::now() >= at) {
            debug!("Artifact {} expired on disk", key);
            self.remove_files(key).await?;
            return Ok(None);
        }

        let path = self.data_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PressError::io(
                    format!("reading artifact {}", path.display()),
                    e,
                ))
            }
        };

        Ok(Some(Arc::new(Artifact {
            bytes,
            kind: meta.kind,
            created_at: meta.created_at,
        })))
    }

    async fn put(
        &self,
        key: &CacheKey,
        artifact: Arc<Artifact>,
        ttl: Option<Duration>,
    ) -> PressResult<()> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            PressError::io(
                format!("creating artifact directory {}", self.dir.display()),
                e,
            )
        })?;

        let data_path = self.data_path(key);
        write_replacing(&data_path, &artifact.bytes).await?;

        let expires_at = match ttl {
            Some(ttl) => Some(
                Utc::now()
                    + chrono::Duration::from_std(ttl)
                        .map_err(|e| PressError::Internal(format!("invalid ttl: {}", e)))?,
            ),
            None => None,
        };
        let meta = ArtifactMeta {
            kind: artifact.kind,
            created_at: artifact.created_at,
            expires_at,
            size: artifact.len(),
        };

        let meta_path = self.meta_path(key);
        let content = serde_json::to_string_pretty(&meta)?;
        write_replacing(&meta_path, content.as_bytes()).await?;

        debug!("Persisted artifact {} to {}", key, data_path.display());
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> PressResult<bool> {
        self.remove_files(key).await
    }

    async fn clear(&self) -> PressResult<usize> {
        let metas = self.meta_files().await?;
        let count = metas.len();

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(PressError::io("reading artifact directory", e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PressError::io("reading artifact entry", e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| PressError::io("reading artifact entry", e))?;
            if file_type.is_file() {
                fs::remove_file(entry.path())
                    .await
                    .map_err(|e| PressError::io("removing artifact file", e))?;
            }
        }

        Ok(count)
    }

    async fn len(&self) -> PressResult<usize> {
        Ok(self.meta_files().await?.len())
    }

    fn backend_name(&self) -> &'static str {
        "disk"
    }
}
