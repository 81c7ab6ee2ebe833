//! Cache key derivation
//!
//! Keys are derived from the ordered source list with SHA256. Under the
//! `Change` strategy each source's modification time is mixed in, so editing
//! any source yields a new key that clients may cache indefinitely. Under
//! `Always`/`Never` the key depends only on the ordered paths and flags.

use crate::asset::{AssetKind, SourceRef};
use crate::strategy::CachingStrategy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Bumped whenever the hashed layout changes
const KEY_VERSION: &[u8] = b"press-key-v1";

/// Hex characters kept from the digest (128 bits)
const KEY_HEX_LEN: usize = 32;

/// Characters left untouched by `escape`
const KEY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Opaque identifier of one artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an existing key string (e.g. one read back from a URL)
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Asset kind encoded in the key suffix, if any
    pub fn kind(&self) -> Option<AssetKind> {
        let (_, ext) = self.0.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A source together with the modification time observed for it
#[derive(Debug, Clone, Copy)]
pub struct SourceStamp<'a> {
    pub source: &'a SourceRef,
    pub modified: SystemTime,
}

impl<'a> SourceStamp<'a> {
    /// Stamp with an explicit modification time
    pub fn new(source: &'a SourceRef, modified: SystemTime) -> Self {
        Self { source, modified }
    }

    /// Stamp for strategies that ignore modification times
    pub fn unstamped(source: &'a SourceRef) -> Self {
        Self {
            source,
            modified: UNIX_EPOCH,
        }
    }
}

/// Derive the key for an ordered, kind-homogeneous list of sources
///
/// Pure: the same stamps and strategy always produce the same key. Each
/// path is length-prefixed so that no two distinct lists hash the same
/// input bytes.
pub fn derive_key(
    kind: AssetKind,
    stamps: &[SourceStamp<'_>],
    strategy: CachingStrategy,
) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(KEY_VERSION);
    hasher.update(kind.ext().as_bytes());
    hasher.update(strategy.to_string().as_bytes());
    hasher.update((stamps.len() as u64).to_le_bytes());

    for stamp in stamps {
        let source = stamp.source;
        hasher.update((source.path.len() as u64).to_le_bytes());
        hasher.update(source.path.as_bytes());
        hasher.update([u8::from(source.minify), u8::from(source.render)]);

        if strategy.uses_timestamps() {
            let nanos = stamp
                .modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            hasher.update(nanos.to_le_bytes());
        }
    }

    let digest = hex::encode(hasher.finalize());
    let key = CacheKey(format!("{}.{}", &digest[..KEY_HEX_LEN], kind.ext()));
    debug!("Derived {} key {} from {} source(s)", kind, key, stamps.len());
    key
}

/// Escape a key for use as a URL query value
pub fn escape(key: &CacheKey) -> String {
    utf8_percent_encode(key.as_str(), KEY_ESCAPE).to_string()
}

/// Reverse `escape`, returning `None` for malformed input
pub fn unescape(escaped: &str) -> Option<CacheKey> {
    percent_decode_str(escaped)
        .decode_utf8()
        .ok()
        .map(|key| CacheKey(key.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn js(path: &str) -> SourceRef {
        SourceRef::new(AssetKind::Script, path, true, false)
    }

    fn stamps<'a>(sources: &'a [SourceRef], secs: &[u64]) -> Vec<SourceStamp<'a>> {
        sources
            .iter()
            .zip(secs)
            .map(|(s, t)| SourceStamp::new(s, UNIX_EPOCH + Duration::from_secs(*t)))
            .collect()
    }

    #[test]
    fn key_deterministic() {
        let sources = [js("a.js"), js("b.js")];
        for strategy in [
            CachingStrategy::Always,
            CachingStrategy::Never,
            CachingStrategy::Change,
        ] {
            let k1 = derive_key(AssetKind::Script, &stamps(&sources, &[10, 20]), strategy);
            let k2 = derive_key(AssetKind::Script, &stamps(&sources, &[10, 20]), strategy);
            assert_eq!(k1, k2);
        }
    }

    #[test]
    fn key_order_sensitive() {
        let ab = [js("a.js"), js("b.js")];
        let ba = [js("b.js"), js("a.js")];
        let k1 = derive_key(AssetKind::Script, &stamps(&ab, &[1, 1]), CachingStrategy::Change);
        let k2 = derive_key(AssetKind::Script, &stamps(&ba, &[1, 1]), CachingStrategy::Change);
        assert_ne!(k1, k2);
    }

    #[test]
    fn key_not_confused_by_concatenation() {
        let split = [js("ab"), js("c.js")];
        let joined = [js("a"), js("bc.js")];
        let k1 = derive_key(AssetKind::Script, &stamps(&split, &[1, 1]), CachingStrategy::Always);
        let k2 = derive_key(AssetKind::Script, &stamps(&joined, &[1, 1]), CachingStrategy::Always);
        assert_ne!(k1, k2);
    }

    #[test]
    fn mtime_changes_key_only_under_change() {
        let sources = [js("a.js"), js("b.js")];
        let before = stamps(&sources, &[100, 200]);
        let after = stamps(&sources, &[100, 201]);

        assert_ne!(
            derive_key(AssetKind::Script, &before, CachingStrategy::Change),
            derive_key(AssetKind::Script, &after, CachingStrategy::Change)
        );
        assert_eq!(
            derive_key(AssetKind::Script, &before, CachingStrategy::Always),
            derive_key(AssetKind::Script, &after, CachingStrategy::Always)
        );
        assert_eq!(
            derive_key(AssetKind::Script, &before, CachingStrategy::Never),
            derive_key(AssetKind::Script, &after, CachingStrategy::Never)
        );
    }

    #[test]
    fn minify_flag_is_part_of_key() {
        let minified = [js("a.js")];
        let plain = [SourceRef::new(AssetKind::Script, "a.js", false, false)];
        assert_ne!(
            derive_key(AssetKind::Script, &stamps(&minified, &[1]), CachingStrategy::Always),
            derive_key(AssetKind::Script, &stamps(&plain, &[1]), CachingStrategy::Always)
        );
    }

    #[test]
    fn key_shape() {
        let sources = [js("a.js")];
        let key = derive_key(AssetKind::Script, &stamps(&sources, &[1]), CachingStrategy::Change);
        assert!(key.as_str().ends_with(".js"));
        assert_eq!(key.as_str().len(), KEY_HEX_LEN + 3);
        assert_eq!(key.kind(), Some(AssetKind::Script));
    }

    #[test]
    fn escape_roundtrip() {
        let sources = [js("a.js")];
        let key = derive_key(AssetKind::Script, &stamps(&sources, &[1]), CachingStrategy::Change);
        assert_eq!(unescape(&escape(&key)), Some(key));

        let odd = CacheKey::new("dir/with space?&=%.css");
        let escaped = escape(&odd);
        assert!(!escaped.contains(' '));
        assert!(!escaped.contains('&'));
        assert_eq!(unescape(&escaped), Some(odd));
    }

    #[test]
    fn unescape_rejects_invalid_utf8() {
        assert_eq!(unescape("%FF%FE"), None);
    }
}
