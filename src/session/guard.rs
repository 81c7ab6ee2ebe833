//! Duplicate source detection

use crate::asset::AssetKind;
use crate::error::{PressError, PressResult};
use std::collections::HashSet;

/// Paths of one kind already registered in the current request
#[derive(Debug)]
pub struct DuplicateGuard {
    kind: AssetKind,
    seen: HashSet<String>,
}

impl DuplicateGuard {
    /// Create an empty guard for `kind`
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            seen: HashSet::new(),
        }
    }

    /// Record `path`, failing if it was already recorded
    pub fn register(&mut self, path: &str) -> PressResult<()> {
        if self.seen.insert(path.to_string()) {
            return Ok(());
        }

        Err(PressError::DuplicateSource {
            kind: self.kind,
            path: path.to_string(),
        })
    }

    /// Whether `path` was recorded
    pub fn contains(&self, path: &str) -> bool {
        self.seen.contains(path)
    }

    /// Number of recorded paths
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
