//! Clear command - empty the configured artifact store

use crate::cli::output;
use crate::config::{Config, StorageBackend};
use crate::error::PressResult;
use crate::store::{create_backend, ArtifactStore};

/// Execute the clear command
pub async fn execute(config: &Config) -> PressResult<()> {
    if config.storage.backend == StorageBackend::Memory {
        output::step_warn_hint(
            "The memory store lives inside a running `press serve`",
            "Enable compression.cache_clear_enabled and request /compressed/clear instead",
        );
        return Ok(());
    }

    let store = ArtifactStore::new(create_backend(&config.storage));
    let count = store.clear().await?;
    output::step_ok_detail(
        &format!("Cleared {} artifacts from cache", count),
        &config.storage.artifact_dir().display().to_string(),
    );
    Ok(())
}
