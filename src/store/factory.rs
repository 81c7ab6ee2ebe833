//! Backend factory
//!
//! Picks the artifact backend named by the storage configuration.

use crate::config::schema::StorageConfig;
use crate::config::StorageBackend;
use crate::store::{ArtifactBackend, DiskBackend, MemoryBackend};
use std::sync::Arc;
use tracing::debug;

/// Create the artifact backend selected by `config`
pub fn create_backend(config: &StorageConfig) -> Arc<dyn ArtifactBackend> {
    match config.backend {
        StorageBackend::Memory => {
            debug!("Using memory artifact backend ({} entries)", config.max_entries);
            Arc::new(MemoryBackend::new(config.max_entries))
        }
        StorageBackend::Disk => {
            let dir = config.artifact_dir();
            debug!("Using disk artifact backend at {}", dir.display());
            Arc::new(DiskBackend::new(dir))
        }
    }
}
