//! Asset kinds and source references
//!
//! A `SourceRef` names one script or stylesheet registered during page
//! rendering. Paths are relative to the kind's configured source directory,
//! unless the source is hosted externally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two kinds of asset that can be aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// JavaScript (`<script>` tags)
    #[serde(rename = "js")]
    Script,
    /// CSS (`<link rel="stylesheet">` tags)
    #[serde(rename = "css")]
    Style,
}

impl AssetKind {
    /// File extension and route segment for this kind
    pub fn ext(&self) -> &'static str {
        match self {
            Self::Script => "js",
            Self::Style => "css",
        }
    }

    /// Content type used when serving artifacts of this kind
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Script => "text/javascript; charset=utf-8",
            Self::Style => "text/css; charset=utf-8",
        }
    }

    /// All kinds, in tag emission order
    pub fn all() -> &'static [Self] {
        &[Self::Style, Self::Script]
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Script => "JavaScript",
            Self::Style => "CSS",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "js" | "javascript" | "script" => Ok(Self::Script),
            "css" | "style" | "stylesheet" => Ok(Self::Style),
            other => Err(format!("unknown asset kind: {}", other)),
        }
    }
}

/// One registered asset source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Asset kind
    pub kind: AssetKind,
    /// Path relative to the kind's source directory, or an absolute URL
    pub path: String,
    /// Minify this source when building the artifact
    pub minify: bool,
    /// Pass this source through the template renderer first
    pub render: bool,
}

impl SourceRef {
    /// Create a new source reference
    pub fn new(kind: AssetKind, path: impl Into<String>, minify: bool, render: bool) -> Self {
        Self {
            kind,
            path: path.into(),
            minify,
            render,
        }
    }

    /// Whether the source is hosted elsewhere and can't be aggregated
    pub fn is_external(&self) -> bool {
        is_external_path(&self.path)
    }
}

/// Check if a path refers to an externally hosted resource
pub fn is_external_path(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("//")
}
