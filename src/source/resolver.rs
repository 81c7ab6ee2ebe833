//! Wildcard resolution of source specifications
//!
//! `*` matches within one directory level, `**` across levels. Matches are
//! returned relative to the source directory in lexical order so the
//! registration order (and therefore the cache key) is stable.

use crate::asset::{is_external_path, AssetKind};
use crate::error::{PressError, PressResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Expands a source specification into concrete relative paths
///
/// Implementations may block on filesystem access; async callers run them
/// on the blocking pool.
pub trait FileResolver: Send + Sync {
    /// Resolve `spec` for `kind`; an empty result fails unless `optional`
    fn resolve(&self, kind: AssetKind, spec: &str, optional: bool) -> PressResult<Vec<String>>;
}

/// Resolver backed by the `glob` crate over a base directory
#[derive(Debug, Clone)]
pub struct GlobResolver {
    base_dir: PathBuf,
}

impl GlobResolver {
    /// Create a resolver for sources under `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn has_wildcard(spec: &str) -> bool {
        spec.contains(['*', '?', '['])
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.base_dir).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

impl FileResolver for GlobResolver {
    fn resolve(&self, kind: AssetKind, spec: &str, optional: bool) -> PressResult<Vec<String>> {
        if is_external_path(spec) || !Self::has_wildcard(spec) {
            return Ok(vec![spec.to_string()]);
        }

        let base = glob::Pattern::escape(&self.base_dir.to_string_lossy());
        let pattern = format!("{}/{}", base.trim_end_matches('/'), spec);
        let entries = glob::glob(&pattern).map_err(|e| PressError::InvalidPattern {
            pattern: spec.to_string(),
            reason: e.to_string(),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| PressError::io(format!("expanding {}", spec), e.into()))?;
            if !path.is_file() {
                continue;
            }
            if let Some(rel) = self.relative(&path) {
                files.push(rel);
            }
        }
        files.sort();

        debug!("Pattern {} matched {} {} file(s)", spec, files.len(), kind);

        if files.is_empty() && !optional {
            return Err(PressError::NoMatchingSource {
                kind,
                pattern: spec.to_string(),
            });
        }

        Ok(files)
    }
}
