//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::cli::output;
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_NAME};
use crate::error::{PressError, PressResult};

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> PressResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force, local }) => {
            if local {
                let cwd = std::env::current_dir()
                    .map_err(|e| PressError::io("getting current directory", e))?;
                init_config(&ConfigManager::with_path(cwd.join(LOCAL_CONFIG_NAME)), force).await?
            } else {
                init_config(manager, force).await?
            }
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> PressResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> PressResult<()> {
    let path = manager.path();

    if path.exists() && !force {
        output::step_warn_hint(
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    output::step_ok_detail("Configuration initialized", &path.display().to_string());
    Ok(())
}
