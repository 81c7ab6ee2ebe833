//! Bundle command - aggregate sources the way one page request would

use crate::cli::args::BundleArgs;
use crate::cli::output;
use crate::config::{Config, StorageBackend};
use crate::error::{PressError, PressResult};
use crate::press::{AddOptions, Press};
use crate::session;
use std::io::Write;
use std::sync::Arc;

/// Execute the bundle command
pub async fn execute(args: BundleArgs, config: Arc<Config>) -> PressResult<()> {
    let in_memory = config.storage.backend == StorageBackend::Memory;
    let press = Press::from_config(config);
    let kind = args.kind;
    let options = AddOptions {
        minify: !args.no_minify,
        render: args.render,
        optional: false,
    };

    let closed = session::scope(async {
        for spec in &args.sources {
            press.add(kind, spec, options).await?;
        }
        press.close(kind).await
    })
    .await?;
    let tag = closed.markup;

    let Some(key) = closed.key else {
        output::step_warn_hint(
            &format!("{} sources were not aggregated", kind),
            "Check the log output (-v) for the reason",
        );
        print!("{}", tag);
        return Ok(());
    };

    output::step_ok_detail(
        &format!("Bundled {} {} source(s)", args.sources.len(), kind),
        press.store().backend_name(),
    );
    if in_memory {
        output::step_info("The memory store is discarded on exit; set storage.backend = \"disk\" to serve this artifact later");
    }

    if args.print {
        let artifact = press
            .store()
            .get(&key)
            .await?
            .ok_or_else(|| PressError::Internal(format!("artifact {} vanished", key)))?;
        std::io::stdout()
            .write_all(&artifact.bytes)
            .map_err(|e| PressError::io("writing artifact to stdout", e))?;
        return Ok(());
    }

    println!("{}", key);
    print!("{}", tag);
    Ok(())
}
