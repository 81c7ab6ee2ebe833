//! Tag markup and URL reversal
//!
//! `UrlReverser` is the contract Press needs from the host's router: turn a
//! named route plus parameters into an absolute URL, and map a source path
//! to its static URL. `BaseUrlReverser` implements it for the routes in
//! `serve::routes`, prefixed with a configurable base URL.

use crate::asset::{is_external_path, AssetKind};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left untouched in query values
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Routes Press emits URLs for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Combined artifact of one request
    Compressed(AssetKind),
    /// Artifact built from a single source
    SingleCompressed(AssetKind),
    /// One source after template rendering, unminified
    Rendered(AssetKind),
    /// Administrative cache clear
    ClearCache,
}

impl Route {
    /// Path component of the route
    pub fn path(&self) -> String {
        match self {
            Self::Compressed(kind) => format!("/compressed/{}", kind.ext()),
            Self::SingleCompressed(kind) => format!("/compressed/{}/single", kind.ext()),
            Self::Rendered(kind) => format!("/compressed/rendered/{}", kind.ext()),
            Self::ClearCache => "/compressed/clear".to_string(),
        }
    }
}

/// Host routing contract
pub trait UrlReverser: Send + Sync {
    /// Absolute URL for `route` with query `params`
    fn reverse(&self, route: Route, params: &[(&str, &str)]) -> String;

    /// URL under which a static file at `path` is served
    fn static_url(&self, path: &str) -> String;
}

/// Reverser that prefixes paths with a fixed base URL
#[derive(Debug, Clone, Default)]
pub struct BaseUrlReverser {
    base_url: String,
}

impl BaseUrlReverser {
    /// Create a reverser for `base_url` (empty for root-relative URLs)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl UrlReverser for BaseUrlReverser {
    fn reverse(&self, route: Route, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}", self.base_url, route.path());
        for (i, (name, value)) in params.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(name);
            url.push('=');
            url.push_str(&utf8_percent_encode(value, QUERY_VALUE).to_string());
        }
        url
    }

    fn static_url(&self, path: &str) -> String {
        if is_external_path(path) {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// `<script>` tag for `src`
pub fn script_tag(src: &str) -> String {
    format!(
        "<script src=\"{}\" type=\"text/javascript\" language=\"javascript\" charset=\"utf-8\"></script>\n",
        escape_attr(src)
    )
}

/// `<link>` tag for `src`, closed with `</link>` unless HTML-compatible
pub fn link_tag(src: &str, html_compatible: bool) -> String {
    format!(
        "<link href=\"{}\" rel=\"stylesheet\" type=\"text/css\" charset=\"utf-8\">{}\n",
        escape_attr(src),
        if html_compatible { "" } else { "</link>" }
    )
}

/// Tag of the right element for `kind`
pub fn tag(kind: AssetKind, src: &str, html_compatible: bool) -> String {
    match kind {
        AssetKind::Script => script_tag(src),
        AssetKind::Style => link_tag(src, html_compatible),
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
