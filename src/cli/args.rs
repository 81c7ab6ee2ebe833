//! CLI argument definitions using clap derive

use crate::asset::AssetKind;
use crate::strategy::CachingStrategy;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Press - JavaScript/CSS aggregation and artifact cache
///
/// Combines the scripts and stylesheets a page registers into one
/// minified artifact per request and serves it back by key.
#[derive(Parser, Debug)]
#[command(name = "press")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PRESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local press.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve artifacts over HTTP
    Serve(ServeArgs),

    /// Aggregate sources as one request would and print the tag
    Bundle(BundleArgs),

    /// Print the cache key for a list of sources
    Key(KeyArgs),

    /// Clear the configured artifact store
    Clear,

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Listen address (defaults to server.bind)
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Arguments for the bundle command
#[derive(Parser, Debug)]
pub struct BundleArgs {
    /// Asset kind: js or css
    #[arg(short, long, value_parser = parse_kind)]
    pub kind: AssetKind,

    /// Source files or wildcard patterns, relative to the kind's source directory
    #[arg(required = true)]
    pub sources: Vec<String>,

    /// Don't minify the sources
    #[arg(long)]
    pub no_minify: bool,

    /// Run the sources through the template renderer
    #[arg(long)]
    pub render: bool,

    /// Print the artifact contents instead of the tag
    #[arg(long)]
    pub print: bool,
}

/// Arguments for the key command
#[derive(Parser, Debug)]
pub struct KeyArgs {
    /// Asset kind: js or css
    #[arg(short, long, value_parser = parse_kind)]
    pub kind: AssetKind,

    /// Caching strategy (defaults to compression.caching)
    #[arg(short, long, value_parser = parse_strategy)]
    pub strategy: Option<CachingStrategy>,

    /// Don't minify the sources
    #[arg(long)]
    pub no_minify: bool,

    /// Source files, in registration order
    #[arg(required = true)]
    pub sources: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,

        /// Write a project-local press.toml in the current directory instead
        #[arg(long)]
        local: bool,
    },
}

fn parse_kind(s: &str) -> Result<AssetKind, String> {
    s.parse()
}

fn parse_strategy(s: &str) -> Result<CachingStrategy, String> {
    s.parse()
}
