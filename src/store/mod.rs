//! Artifact storage
//!
//! `ArtifactStore` memoizes combined artifacts by cache key. Computation is
//! single-flight per key: concurrent callers for a key that is not stored
//! yet share one in-flight cell, and only the caller holding the cell's
//! initialization permit runs its factory. Unrelated keys compute in
//! parallel. Where artifacts live is decided by an `ArtifactBackend`.
//!
//! # Lifetimes
//!
//! | Strategy | TTL | Reason |
//! |----------|-----|--------|
//! | change | none | key is content-addressed, a new version gets a new key |
//! | always | retention window | key survives source edits |
//! | never | retention window | recomputed on every close, replacing the stored entry |

pub mod disk;
pub mod factory;
pub mod memory;

pub use disk::DiskBackend;
pub use factory::create_backend;
pub use memory::MemoryBackend;

use crate::asset::AssetKind;
use crate::error::{PressError, PressResult};
use crate::key::CacheKey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// A computed, immutable artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Combined (and possibly minified) contents
    pub bytes: Vec<u8>,
    /// Kind of content
    pub kind: AssetKind,
    /// When the artifact was computed
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Create an artifact stamped with the current time
    pub fn new(kind: AssetKind, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            kind,
            created_at: Utc::now(),
        }
    }

    /// Size of the contents in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the artifact has no contents
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Metadata recorded alongside a stored artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub kind: AssetKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub size: usize,
}

/// Storage backend for artifacts
///
/// Backends hold finished artifacts only. Single-flight coordination lives
/// in `ArtifactStore`, so a backend needs no knowledge of in-progress work.
#[async_trait]
pub trait ArtifactBackend: Send + Sync {
    /// Look up an artifact; expired entries read as absent
    async fn get(&self, key: &CacheKey) -> PressResult<Option<Arc<Artifact>>>;

    /// Store an artifact, expiring after `ttl` when given
    async fn put(
        &self,
        key: &CacheKey,
        artifact: Arc<Artifact>,
        ttl: Option<Duration>,
    ) -> PressResult<()>;

    /// Remove one artifact, returning whether it existed
    async fn remove(&self, key: &CacheKey) -> PressResult<bool>;

    /// Remove every artifact, returning how many were removed
    async fn clear(&self) -> PressResult<usize>;

    /// Number of stored artifacts
    async fn len(&self) -> PressResult<usize>;

    /// Human-readable backend name for display
    fn backend_name(&self) -> &'static str;
}

type InFlight = DashMap<CacheKey, Arc<OnceCell<Arc<Artifact>>>>;

/// Key-to-artifact memoization with single-flight computation
pub struct ArtifactStore {
    backend: Arc<dyn ArtifactBackend>,
    in_flight: Arc<InFlight>,
}

impl ArtifactStore {
    /// Create a store over a backend
    pub fn new(backend: Arc<dyn ArtifactBackend>) -> Self {
        Self {
            backend,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Create a store over a fresh in-memory backend
    pub fn in_memory(max_entries: usize) -> Self {
        Self::new(Arc::new(MemoryBackend::new(max_entries)))
    }

    /// Name of the underlying backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Return the artifact for `key`, computing it with `factory` if absent
    ///
    /// At most one factory runs per key across concurrent callers; the
    /// others wait for and receive its result. A failed factory is not
    /// cached, so a later call retries. The computation runs on its own task
    /// and finishes (populating the store) even if the caller is dropped.
    pub async fn compute_if_absent<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        factory: F,
    ) -> PressResult<Arc<Artifact>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = PressResult<Artifact>> + Send + 'static,
    {
        if let Some(existing) = self.backend.get(key).await? {
            return Ok(existing);
        }
        self.single_flight(key, ttl, true, factory).await
    }

    /// Compute a fresh artifact for `key` and replace the stored one
    ///
    /// The previous artifact stays readable until the new one is stored, so
    /// a fetch racing the recomputation sees either version, never neither.
    /// Concurrent recomputations of one key still share a single factory run.
    pub async fn recompute<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        factory: F,
    ) -> PressResult<Arc<Artifact>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = PressResult<Artifact>> + Send + 'static,
    {
        self.single_flight(key, ttl, false, factory).await
    }

    async fn single_flight<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        reuse_stored: bool,
        factory: F,
    ) -> PressResult<Arc<Artifact>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = PressResult<Artifact>> + Send + 'static,
    {
        let cell = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let backend = Arc::clone(&self.backend);
        let in_flight = Arc::clone(&self.in_flight);
        let task_key = key.clone();

        let task = tokio::spawn(async move {
            let result = cell
                .get_or_try_init(|| async {
                    if reuse_stored {
                        if let Some(existing) = backend.get(&task_key).await? {
                            return Ok(existing);
                        }
                    }

                    let artifact = Arc::new(factory().await?);
                    backend.put(&task_key, Arc::clone(&artifact), ttl).await?;
                    info!(
                        "Computed {} artifact {} ({} bytes)",
                        artifact.kind,
                        task_key,
                        artifact.len()
                    );
                    Ok::<_, PressError>(artifact)
                })
                .await
                .cloned();

            in_flight.remove_if(&task_key, |_, current| Arc::ptr_eq(current, &cell));
            result
        });

        task.await.map_err(|e| {
            PressError::Internal(format!("artifact computation for {} failed: {}", key, e))
        })?
    }

    /// Look up a finished artifact without waiting for in-flight work
    pub async fn get(&self, key: &CacheKey) -> PressResult<Option<Arc<Artifact>>> {
        self.backend.get(key).await
    }

    /// Whether a computation for `key` is currently running
    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Evict every artifact, returning how many were removed
    pub async fn clear(&self) -> PressResult<usize> {
        let count = self.backend.clear().await?;
        info!("Cleared {} artifact(s) from {} store", count, self.backend_name());
        Ok(count)
    }

    /// Number of stored artifacts
    pub async fn len(&self) -> PressResult<usize> {
        let count = self.backend.len().await?;
        debug!("{} store holds {} artifact(s)", self.backend_name(), count);
        Ok(count)
    }
}
