//! Press - JavaScript/CSS aggregation and artifact cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use press::cli::args::ConfigAction;
use press::cli::{Cli, Commands};
use press::config::{Config, ConfigManager};
use press::error::{PressError, PressResult};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PressResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // An explicit --config must exist, except when creating it
    let creating = matches!(
        &cli.command,
        Commands::Config(args) if matches!(args.action, Some(ConfigAction::Init { .. }) | Some(ConfigAction::Path))
    );
    if cli.config.is_some() && !creating && !config_manager.path().exists() {
        return Err(PressError::ConfigNotFound(config_manager.path().to_path_buf()));
    }

    // Find local config unless --no-local or --config is set
    let local_config_path = if cli.no_local || cli.config.is_some() {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| PressError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_with_local(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, &config);
    if let Some(ref path) = local_config_path {
        debug!("Using local config: {}", path.display());
    }

    let config = Arc::new(config);

    match cli.command {
        Commands::Serve(args) => press::cli::commands::serve(args, config).await,
        Commands::Bundle(args) => press::cli::commands::bundle(args, config).await,
        Commands::Key(args) => press::cli::commands::key(args, config).await,
        Commands::Clear => press::cli::commands::clear(&config).await,
        Commands::Config(args) => {
            press::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// Initialize logging: 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("press=warn"),
        1 => EnvFilter::new("press=info"),
        _ => EnvFilter::new("press=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
