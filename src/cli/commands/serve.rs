//! Serve command - run the HTTP surface

use crate::cli::args::ServeArgs;
use crate::cli::output;
use crate::config::{Config, StorageBackend};
use crate::error::PressResult;
use crate::press::Press;
use crate::serve::{self, ServingLayer};
use std::sync::Arc;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Arc<Config>) -> PressResult<()> {
    let press = Arc::new(Press::from_config(Arc::clone(&config)));

    // Persisted artifacts are kept so `press bundle` output stays fetchable
    if config.storage.backend == StorageBackend::Memory {
        press.store().clear().await?;
    }

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    output::step_ok_detail(
        &format!("Serving {} artifacts", press.store().backend_name()),
        &format!("http://{}", bind),
    );
    output::step_info(&format!(
        "Caching strategy: {}, compression {}",
        config.compression.caching,
        if config.compression.enabled {
            "enabled"
        } else {
            "disabled"
        }
    ));

    let serving = Arc::new(ServingLayer::new(press));
    serve::run_server(&bind, serving).await
}
