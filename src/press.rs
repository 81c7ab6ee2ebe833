//! Page-rendering facade
//!
//! `Press` is what templates call while a page renders. It must run inside
//! a request scope (see `session::scope`); every call reads or updates the
//! current request's session.
//!
//! When aggregation is active, `add` records sources and returns a marker
//! comment, and `compressed_tag` emits one tag for the combined artifact.
//! When aggregation is off (disabled in configuration, or an error already
//! happened in this request), every source gets its own tag instead.

use crate::asset::{AssetKind, SourceRef};
use crate::compressor::{Collaborators, Compressor};
use crate::config::Config;
use crate::error::{PressError, PressResult};
use crate::key::{self, CacheKey};
use crate::session;
use crate::store::ArtifactStore;
use crate::tags::{self, BaseUrlReverser, Route, UrlReverser};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-call options for `Press::add`
#[derive(Debug, Clone, Copy)]
pub struct AddOptions {
    /// Minify the sources when aggregating
    pub minify: bool,
    /// Run the sources through the template renderer first
    pub render: bool,
    /// Allow a wildcard specification to match nothing
    pub optional: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            minify: true,
            render: false,
            optional: false,
        }
    }
}

/// Markup emitted when a kind is closed, with the artifact it names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosedTag {
    /// Tag (or fallback tags) to place in the page
    pub markup: String,
    /// Key of the combined artifact, when one was built
    pub key: Option<CacheKey>,
}

impl ClosedTag {
    fn individual(markup: String) -> Self {
        Self { markup, key: None }
    }
}

/// Asset aggregation entry point
pub struct Press {
    config: Arc<Config>,
    scripts: Compressor,
    styles: Compressor,
    urls: Arc<dyn UrlReverser>,
}

impl Press {
    /// Create a Press instance with explicit collaborators
    pub fn new(config: Arc<Config>, collab: Collaborators, urls: Arc<dyn UrlReverser>) -> Self {
        let scripts = Compressor::new(AssetKind::Script, &config, &collab);
        let styles = Compressor::new(AssetKind::Style, &config, &collab);
        Self {
            config,
            scripts,
            styles,
            urls,
        }
    }

    /// Create a Press instance with the default collaborators
    pub fn from_config(config: Arc<Config>) -> Self {
        let collab = Collaborators::from_config(&config);
        let urls = Arc::new(BaseUrlReverser::new(config.server.base_url.clone()));
        Self::new(config, collab, urls)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compressor for one asset kind
    pub fn compressor(&self, kind: AssetKind) -> &Compressor {
        match kind {
            AssetKind::Script => &self.scripts,
            AssetKind::Style => &self.styles,
        }
    }

    /// Artifact store shared by both compressors
    pub fn store(&self) -> &Arc<ArtifactStore> {
        self.scripts.store()
    }

    /// Whether the current request aggregates sources
    pub fn perform_compression(&self) -> bool {
        self.config.compression.enabled && !session::error_occurred()
    }

    /// Register every source matching `spec`
    ///
    /// Structural problems (missing file, no match, duplicate) fail
    /// immediately and disable aggregation for the rest of the request.
    pub async fn add(&self, kind: AssetKind, spec: &str, options: AddOptions) -> PressResult<String> {
        flag_error(self.try_add(kind, spec, options).await)
    }

    /// Register one source to be served as its own artifact
    pub async fn add_single(&self, kind: AssetKind, file: &str, render: bool) -> PressResult<String> {
        flag_error(self.try_add_single(kind, file, render).await)
    }

    /// Emit the tag for everything registered for `kind` in this request
    ///
    /// Closes the kind for the rest of the request. A second call returns an
    /// empty string. If building the artifact fails with a degradable
    /// error, the registered sources are emitted as individual tags.
    pub async fn compressed_tag(&self, kind: AssetKind) -> PressResult<String> {
        Ok(self.close(kind).await?.markup)
    }

    /// Like `compressed_tag`, also reporting the key the tag points at
    pub async fn close(&self, kind: AssetKind) -> PressResult<ClosedTag> {
        flag_error(self.try_close(kind).await)
    }

    pub async fn add_js(&self, spec: &str, options: AddOptions) -> PressResult<String> {
        self.add(AssetKind::Script, spec, options).await
    }

    pub async fn add_css(&self, spec: &str, options: AddOptions) -> PressResult<String> {
        self.add(AssetKind::Style, spec, options).await
    }

    pub async fn add_single_js(&self, file: &str, render: bool) -> PressResult<String> {
        self.add_single(AssetKind::Script, file, render).await
    }

    pub async fn add_single_css(&self, file: &str, render: bool) -> PressResult<String> {
        self.add_single(AssetKind::Style, file, render).await
    }

    pub async fn compressed_js_tag(&self) -> PressResult<String> {
        self.compressed_tag(AssetKind::Script).await
    }

    pub async fn compressed_css_tag(&self) -> PressResult<String> {
        self.compressed_tag(AssetKind::Style).await
    }

    async fn try_add(&self, kind: AssetKind, spec: &str, options: AddOptions) -> PressResult<String> {
        let compressor = self.compressor(kind);
        let mut markup = String::new();

        for file in compressor.resolve(spec, options.optional).await? {
            let source = SourceRef::new(kind, file, options.minify, options.render);
            compressor.check_exists(&source).await?;

            let aggregate = self.perform_compression() && !source.is_external();
            session::with_current(|s| s.register(source.clone(), aggregate))??;

            if aggregate {
                debug!("Queued {} file {} for aggregation", kind, source.path);
                markup.push_str(&format!("<!-- press {}: {} -->\n", kind.ext(), source.path));
            } else {
                markup.push_str(&self.individual_tag(&source));
            }
        }

        Ok(markup)
    }

    async fn try_add_single(&self, kind: AssetKind, file: &str, render: bool) -> PressResult<String> {
        let compressor = self.compressor(kind);
        let source = SourceRef::new(kind, file, true, render);
        compressor.check_exists(&source).await?;
        session::with_current(|s| s.register(source.clone(), false))??;

        if !self.perform_compression() || source.is_external() {
            return Ok(self.individual_tag(&source));
        }

        match compressor.compressed_single_file_key(&source).await {
            Ok(key) => Ok(self.artifact_tag(kind, Route::SingleCompressed(kind), &key)),
            Err(e) if e.is_degradable() => {
                self.degrade(kind, &e);
                Ok(self.individual_tag(&source))
            }
            Err(e) => Err(e),
        }
    }

    async fn try_close(&self, kind: AssetKind) -> PressResult<ClosedTag> {
        let Some(sources) = session::with_current(|s| s.close(kind))? else {
            debug!("{} tag already emitted for this request", kind);
            return Ok(ClosedTag::default());
        };
        if sources.is_empty() {
            return Ok(ClosedTag::default());
        }
        if !self.perform_compression() {
            return Ok(ClosedTag::individual(self.individual_tags(&sources)));
        }

        match self.compressor(kind).close_request(sources.clone()).await {
            Ok(key) => Ok(ClosedTag {
                markup: self.artifact_tag(kind, Route::Compressed(kind), &key),
                key: Some(key),
            }),
            Err(e) if e.is_degradable() => {
                self.degrade(kind, &e);
                Ok(ClosedTag::individual(self.individual_tags(&sources)))
            }
            Err(e) => Err(e),
        }
    }

    fn degrade(&self, kind: AssetKind, error: &PressError) {
        warn!(
            session = ?session::current_id(),
            "Serving {} files individually: {}",
            kind,
            error
        );
        session::mark_error();
    }

    fn artifact_tag(&self, kind: AssetKind, route: Route, key: &CacheKey) -> String {
        let src = self.urls.reverse(route, &[("key", &key::escape(key))]);
        tags::tag(kind, &src, self.config.compression.html_compatible)
    }

    /// URL a source is served from when not aggregated
    pub fn individual_url(&self, source: &SourceRef) -> String {
        if source.is_external() {
            return source.path.clone();
        }
        if source.render {
            return self
                .urls
                .reverse(Route::Rendered(source.kind), &[("file", &source.path)]);
        }
        let src_dir = self.config.asset(source.kind).src_dir();
        if src_dir.is_empty() {
            self.urls.static_url(&source.path)
        } else {
            self.urls.static_url(&format!("{}/{}", src_dir, source.path))
        }
    }

    fn individual_tag(&self, source: &SourceRef) -> String {
        tags::tag(
            source.kind,
            &self.individual_url(source),
            self.config.compression.html_compatible,
        )
    }

    fn individual_tags(&self, sources: &[SourceRef]) -> String {
        sources.iter().map(|s| self.individual_tag(s)).collect()
    }
}

/// Disable aggregation for the rest of the request when `result` failed
fn flag_error<T>(result: PressResult<T>) -> PressResult<T> {
    if result.is_err() {
        session::mark_error();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::CachingStrategy;
    use tempfile::TempDir;

    struct Site {
        _temp: TempDir,
        press: Press,
    }

    fn site(configure: impl FnOnce(&mut Config)) -> Site {
        let temp = TempDir::new().unwrap();
        let js_dir = temp.path().join("public/javascripts");
        let css_dir = temp.path().join("public/stylesheets");
        std::fs::create_dir_all(js_dir.join("lib")).unwrap();
        std::fs::create_dir_all(&css_dir).unwrap();
        std::fs::write(js_dir.join("a.js"), "var a = 1;").unwrap();
        std::fs::write(js_dir.join("b.js"), "// b\nvar b = 2;").unwrap();
        std::fs::write(js_dir.join("bad.js"), "var s = \"broken;").unwrap();
        std::fs::write(js_dir.join("lib/x.js"), "var x;").unwrap();
        std::fs::write(js_dir.join("lib/y.js"), "var y;").unwrap();
        std::fs::write(css_dir.join("site.css"), "a { color: red; }").unwrap();

        let mut config = Config::default();
        config.general.root = temp.path().to_path_buf();
        config.compression.caching = CachingStrategy::Always;
        configure(&mut config);

        Site {
            _temp: temp,
            press: Press::from_config(Arc::new(config)),
        }
    }

    #[tokio::test]
    async fn aggregates_into_one_tag() {
        let site = site(|_| {});
        let press = &site.press;

        let tag = session::scope(async {
            let marker = press.add_js("a.js", AddOptions::default()).await.unwrap();
            assert!(marker.starts_with("<!--"));
            press.add_js("b.js", AddOptions::default()).await.unwrap();
            press.compressed_js_tag().await.unwrap()
        })
        .await;

        assert!(tag.starts_with("<script src=\"/compressed/js?key="));
        assert_eq!(press.store().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn close_reports_the_key_in_its_tag() {
        let site = site(|_| {});
        let press = &site.press;

        let closed = session::scope(async {
            press.add_js("a.js", AddOptions::default()).await.unwrap();
            press.close(AssetKind::Script).await.unwrap()
        })
        .await;

        let key = closed.key.unwrap();
        assert!(closed.markup.contains(&format!("?key={}", key::escape(&key))));
        assert!(press.store().get(&key).await.unwrap().is_some());

        let degraded = session::scope(async {
            press.add_js("bad.js", AddOptions::default()).await.unwrap();
            press.close(AssetKind::Script).await.unwrap()
        })
        .await;
        assert!(degraded.key.is_none());
        assert!(degraded.markup.contains("/public/javascripts/bad.js"));
    }

    #[tokio::test]
    async fn second_close_is_empty_and_blocks_registration() {
        let site = site(|_| {});
        let press = &site.press;

        session::scope(async {
            press.add_js("a.js", AddOptions::default()).await.unwrap();
            assert!(!press.compressed_js_tag().await.unwrap().is_empty());
            assert_eq!(press.compressed_js_tag().await.unwrap(), "");

            let err = press.add_js("b.js", AddOptions::default()).await.unwrap_err();
            assert!(matches!(err, PressError::SessionClosed { .. }));
        })
        .await;
    }

    #[tokio::test]
    async fn duplicate_registration_fails_within_a_request_only() {
        let site = site(|_| {});
        let press = &site.press;

        session::scope(async {
            press.add_js("a.js", AddOptions::default()).await.unwrap();
            let err = press.add_js("a.js", AddOptions::default()).await.unwrap_err();
            assert!(matches!(err, PressError::DuplicateSource { .. }));
        })
        .await;

        session::scope(async {
            press.add_js("a.js", AddOptions::default()).await.unwrap();
        })
        .await;
    }

    #[tokio::test]
    async fn missing_sources_fail_loudly() {
        let site = site(|_| {});
        let press = &site.press;

        session::scope(async {
            let err = press.add_js("nope.js", AddOptions::default()).await.unwrap_err();
            assert!(matches!(err, PressError::SourceNotFound { .. }));
            let err = press.add_js("none/*.js", AddOptions::default()).await.unwrap_err();
            assert!(matches!(err, PressError::NoMatchingSource { .. }));

            let optional = AddOptions {
                optional: true,
                ..AddOptions::default()
            };
            assert_eq!(press.add_js("none/*.js", optional).await.unwrap(), "");
        })
        .await;
    }

    #[tokio::test]
    async fn compression_failure_falls_back_to_individual_tags() {
        let site = site(|_| {});
        let press = &site.press;

        let tags = session::scope(async {
            press.add_js("a.js", AddOptions::default()).await.unwrap();
            press.add_js("bad.js", AddOptions::default()).await.unwrap();
            let tags = press.compressed_js_tag().await.unwrap();
            assert!(session::error_occurred());
            tags
        })
        .await;

        assert!(tags.contains("src=\"/public/javascripts/a.js\""));
        assert!(tags.contains("src=\"/public/javascripts/bad.js\""));
        assert_eq!(press.store().len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn disabled_compression_emits_individual_tags() {
        let site = site(|config| config.compression.enabled = false);
        let press = &site.press;

        session::scope(async {
            let tags = press.add_js("lib/*.js", AddOptions::default()).await.unwrap();
            assert_eq!(
                tags,
                "<script src=\"/public/javascripts/lib/x.js\" type=\"text/javascript\" language=\"javascript\" charset=\"utf-8\"></script>\n\
                 <script src=\"/public/javascripts/lib/y.js\" type=\"text/javascript\" language=\"javascript\" charset=\"utf-8\"></script>\n"
            );
            assert_eq!(press.compressed_js_tag().await.unwrap(), "");
        })
        .await;
    }

    #[tokio::test]
    async fn rendered_sources_use_their_own_kind_route() {
        let site = site(|config| config.compression.enabled = false);
        let press = &site.press;

        session::scope(async {
            let css = press.add_single_css("site.css", true).await.unwrap();
            assert!(css.contains("href=\"/compressed/rendered/css?file=site.css\""));
            let js = press.add_single_js("a.js", true).await.unwrap();
            assert!(js.contains("src=\"/compressed/rendered/js?file=a.js\""));
        })
        .await;
    }

    #[tokio::test]
    async fn external_sources_are_never_aggregated() {
        let site = site(|_| {});
        let press = &site.press;

        session::scope(async {
            let tag = press
                .add_js("https://cdn.example.com/lib.js", AddOptions::default())
                .await
                .unwrap();
            assert!(tag.contains("src=\"https://cdn.example.com/lib.js\""));
            assert_eq!(press.compressed_js_tag().await.unwrap(), "");
        })
        .await;
    }

    #[tokio::test]
    async fn single_file_uses_single_route() {
        let site = site(|config| config.compression.html_compatible = true);
        let press = &site.press;

        let tag = session::scope(async { press.add_single_css("site.css", false).await.unwrap() }).await;
        assert!(tag.starts_with("<link href=\"/compressed/css/single?key="));
        assert!(!tag.contains("</link>"));
    }

    #[tokio::test]
    async fn error_disables_aggregation_for_the_rest_of_the_request() {
        let site = site(|_| {});
        let press = &site.press;

        session::scope(async {
            press.add_js("a.js", AddOptions::default()).await.unwrap();
            assert!(press.add_js("missing.js", AddOptions::default()).await.is_err());

            let tag = press.add_js("b.js", AddOptions::default()).await.unwrap();
            assert!(tag.starts_with("<script src=\"/public/javascripts/b.js\""));

            let tags = press.compressed_js_tag().await.unwrap();
            assert!(tags.contains("src=\"/public/javascripts/a.js\""));
            assert!(!tags.contains("b.js"));
        })
        .await;
    }

    #[tokio::test]
    async fn calls_outside_a_scope_fail() {
        let site = site(|_| {});
        let err = site
            .press
            .compressed_css_tag()
            .await
            .unwrap_err();
        assert!(matches!(err, PressError::NoActiveSession));
    }
}
