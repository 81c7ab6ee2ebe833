//! Error types for Press
//!
//! All modules use `PressResult<T>` as their return type.

use crate::asset::AssetKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Press operations
pub type PressResult<T> = Result<T, PressError>;

/// All errors that can occur in Press
#[derive(Error, Debug)]
pub enum PressError {
    // Registration errors
    #[error("{kind} file not found: {path}")]
    SourceNotFound { kind: AssetKind, path: String },

    #[error("No {kind} files match the pattern: {pattern}")]
    NoMatchingSource { kind: AssetKind, pattern: String },

    #[error("Attempt to add the same {kind} file \"{path}\" twice in one request")]
    DuplicateSource { kind: AssetKind, path: String },

    #[error("Invalid source pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // Artifact computation errors
    #[error("Could not minify {path}: {reason} (near \"{excerpt}\")")]
    Compression {
        path: String,
        excerpt: String,
        reason: String,
    },

    #[error("Could not render {path}: {reason}")]
    Render { path: String, reason: String },

    // Session errors
    #[error("The {kind} tag for this request was already emitted")]
    SessionClosed { kind: AssetKind },

    #[error("No request scope is active")]
    NoActiveSession,

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // Server errors
    #[error("Server error: {0}")]
    Server(String),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PressError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a compression error for a source
    pub fn compression(
        path: impl Into<String>,
        excerpt: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Compression {
            path: path.into(),
            excerpt: excerpt.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error should switch the request to individually served
    /// sources instead of failing it
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::Compression { .. } | Self::Render { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::SourceNotFound { .. } => {
                Some("Paths are relative to the configured src_dir for the asset kind")
            }
            Self::NoMatchingSource { .. } => {
                Some("Check the pattern or register it as optional")
            }
            Self::DuplicateSource { .. } => {
                Some("Each source may only be added once per page, check included templates")
            }
            Self::NoActiveSession => Some("Wrap request handling in press::session::scope"),
            Self::ConfigInvalid { .. } => Some("Run: press config show"),
            Self::ConfigNotFound(_) => Some("Create it with: press --config <path> config init"),
            _ => None,
        }
    }
}
