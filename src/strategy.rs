//! Caching strategy
//!
//! Decides whether cache keys are content-addressed (`Change`) and therefore
//! safe for long-lived browser caching.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy for artifact keys and client-side caching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachingStrategy {
    /// Key depends only on the source paths, artifact reused until evicted
    Always,
    /// Key depends only on the source paths, artifact rebuilt on every close
    Never,
    /// Key includes source modification times, clients may cache forever
    #[default]
    Change,
}

impl CachingStrategy {
    /// Whether keys incorporate source modification times
    pub fn uses_timestamps(&self) -> bool {
        matches!(self, Self::Change)
    }

    /// Whether served artifacts may carry far-future cache headers
    pub fn browser_cacheable(&self) -> bool {
        matches!(self, Self::Change)
    }
}

impl fmt::Display for CachingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Always => "always",
            Self::Never => "never",
            Self::Change => "change",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for CachingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            "change" => Ok(Self::Change),
            other => Err(format!(
                "unknown caching strategy: {} (expected always, never or change)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_change() {
        assert_eq!(CachingStrategy::default(), CachingStrategy::Change);
    }

    #[test]
    fn parse_roundtrip() {
        for strategy in [
            CachingStrategy::Always,
            CachingStrategy::Never,
            CachingStrategy::Change,
        ] {
            assert_eq!(strategy.to_string().parse::<CachingStrategy>(), Ok(strategy));
        }
        assert!("sometimes".parse::<CachingStrategy>().is_err());
    }

    #[test]
    fn only_change_is_browser_cacheable() {
        assert!(CachingStrategy::Change.browser_cacheable());
        assert!(!CachingStrategy::Always.browser_cacheable());
        assert!(!CachingStrategy::Never.uses_timestamps());
    }
}
