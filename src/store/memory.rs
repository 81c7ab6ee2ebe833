//! Bounded in-memory artifact backend

use super::{Artifact, ArtifactBackend};
use crate::error::PressResult;
use crate::key::CacheKey;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

struct Entry {
    artifact: Arc<Artifact>,
    inserted_at: Instant,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process artifact map with a capacity bound and per-entry expiry
pub struct MemoryBackend {
    entries: DashMap<CacheKey, Entry>,
    max_entries: usize,
}

impl MemoryBackend {
    /// Create a backend holding at most `max_entries` artifacts
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Drop expired entries, then the oldest ones until within capacity
    fn evict(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.inserted_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    debug!("Evicting artifact {} (capacity {})", key, self.max_entries);
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl ArtifactBackend for MemoryBackend {
    async fn get(&self, key: &CacheKey) -> PressResult<Option<Arc<Artifact>>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                return Ok(Some(Arc::clone(&entry.artifact)));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!("Artifact {} expired", key);
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(None)
    }

    async fn put(
        &self,
        key: &CacheKey,
        artifact: Arc<Artifact>,
        ttl: Option<Duration>,
    ) -> PressResult<()> {
        let now = Instant::now();
        self.entries.insert(
            key.clone(),
            Entry {
                artifact,
                inserted_at: now,
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
        if self.entries.len() > self.max_entries {
            self.evict();
        }
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> PressResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn clear(&self) -> PressResult<usize> {
        let count = self.entries.len();
        self.entries.clear();
        Ok(count)
    }

    async fn len(&self) -> PressResult<usize> {
        let now = Instant::now();
        Ok(self
            .entries
            .iter()
            .filter(|entry| !entry.is_expired(now))
            .count())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
