//! Key command - print the cache key for a source list

use crate::asset::SourceRef;
use crate::cli::args::KeyArgs;
use crate::compressor::{Collaborators, Compressor};
use crate::config::Config;
use crate::error::PressResult;
use std::sync::Arc;

/// Execute the key command
pub async fn execute(args: KeyArgs, config: Arc<Config>) -> PressResult<()> {
    let mut config = (*config).clone();
    if let Some(strategy) = args.strategy {
        config.compression.caching = strategy;
    }

    let compressor = Compressor::new(args.kind, &config, &Collaborators::from_config(&config));
    let sources: Vec<SourceRef> = args
        .sources
        .iter()
        .map(|path| SourceRef::new(args.kind, path.as_str(), !args.no_minify, false))
        .collect();

    for source in &sources {
        compressor.check_exists(source).await?;
    }

    let key = compressor.key_for(&sources).await?;
    println!("{}", key);
    Ok(())
}
