//! Configuration schema for Press
//!
//! Configuration is stored at `~/.config/press/config.toml`, or in a
//! project-local `press.toml`.

use crate::asset::AssetKind;
use crate::strategy::CachingStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Aggregation and client caching behaviour
    pub compression: CompressionConfig,

    /// Artifact storage backend
    pub storage: StorageConfig,

    /// JavaScript sources
    pub js: AssetConfig,

    /// CSS sources
    pub css: AssetConfig,

    /// HTTP surface
    pub server: ServerConfig,

    /// Template variables for rendered sources
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            compression: CompressionConfig::default(),
            storage: StorageConfig::default(),
            js: AssetConfig::new("public/javascripts"),
            css: AssetConfig::new("public/stylesheets"),
            server: ServerConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    /// Source settings for an asset kind
    pub fn asset(&self, kind: AssetKind) -> &AssetConfig {
        match kind {
            AssetKind::Script => &self.js,
            AssetKind::Style => &self.css,
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Project root that source directories are relative to
    pub root: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            root: PathBuf::from("."),
        }
    }
}

/// Aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Aggregate registered sources into one artifact per tag
    pub enabled: bool,

    /// Key and client caching policy
    pub caching: CachingStrategy,

    /// Emit `<link>` tags without a closing tag
    pub html_compatible: bool,

    /// Allow the clear-cache endpoint
    pub cache_clear_enabled: bool,

    /// How long always/never artifacts stay fetchable after a render
    pub key_storage_secs: u64,

    /// HTTP status of the missing-artifact placeholder
    pub placeholder_status: u16,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            caching: CachingStrategy::Change,
            html_compatible: false,
            cache_clear_enabled: false,
            key_storage_secs: 120,
            placeholder_status: 200,
        }
    }
}

impl CompressionConfig {
    /// Retention window for artifacts whose key is not content-addressed
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.key_storage_secs)
    }
}

/// Where artifacts are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Bounded in-process map
    #[default]
    Memory,
    /// Files under `storage.dir`
    Disk,
}

/// Artifact storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection
    pub backend: StorageBackend,

    /// Directory for the disk backend (defaults to the state directory)
    pub dir: Option<PathBuf>,

    /// Maximum number of artifacts kept by the memory backend
    pub max_entries: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            dir: None,
            max_entries: 512,
        }
    }
}

impl StorageConfig {
    /// Resolved artifact directory for the disk backend
    pub fn artifact_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| super::ConfigManager::state_dir().join("artifacts"))
    }
}

/// Per-kind source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Directory holding the sources, relative to `general.root`
    pub src_dir: String,
}

impl AssetConfig {
    /// Create settings for a source directory
    pub fn new(src_dir: impl Into<String>) -> Self {
        Self {
            src_dir: src_dir.into(),
        }
    }

    /// Source directory without surrounding slashes
    pub fn src_dir(&self) -> &str {
        self.src_dir.trim_matches('/')
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,

    /// Absolute URL prefix used for emitted tags (empty for root-relative)
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:9000".to_string(),
            base_url: String::new(),
        }
    }
}

/// Template rendering settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Values for `{{ name }}` placeholders
    pub vars: BTreeMap<String, String>,
}
