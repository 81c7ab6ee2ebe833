//! Per-kind aggregation pipeline
//!
//! A `Compressor` is instantiated once per `AssetKind`. It resolves source
//! specifications, checks that sources exist, and turns the ordered source
//! list of a closed request into a memoized artifact:
//!
//! 1. Read modification times (only when the strategy keys on them)
//! 2. Derive the cache key
//! 3. On a store miss, read, render, and minify each source in order and
//!    join the results

use crate::asset::{AssetKind, SourceRef};
use crate::config::Config;
use crate::error::{PressError, PressResult};
use crate::key::{self, CacheKey, SourceStamp};
use crate::minify::{BasicMinifier, Minifier};
use crate::render::{TemplateRenderer, VariableRenderer};
use crate::source::{FileResolver, FsSourceStore, GlobResolver, SourceStore};
use crate::store::{create_backend, Artifact, ArtifactStore};
use crate::strategy::CachingStrategy;
use futures_util::future::try_join_all;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Shared collaborators used by both compressors
#[derive(Clone)]
pub struct Collaborators {
    pub sources: Arc<dyn SourceStore>,
    pub minifier: Arc<dyn Minifier>,
    pub renderer: Arc<dyn TemplateRenderer>,
    pub store: Arc<ArtifactStore>,
}

impl Collaborators {
    /// Default collaborators for a configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            sources: Arc::new(FsSourceStore::new(config.general.root.clone())),
            minifier: Arc::new(BasicMinifier),
            renderer: Arc::new(VariableRenderer::new(config.render.vars.clone())),
            store: Arc::new(ArtifactStore::new(create_backend(&config.storage))),
        }
    }
}

/// The read/render/minify steps, detached from the compressor so a spawned
/// computation can own them
#[derive(Clone)]
struct Pipeline {
    kind: AssetKind,
    src_dir: PathBuf,
    sources: Arc<dyn SourceStore>,
    minifier: Arc<dyn Minifier>,
    renderer: Arc<dyn TemplateRenderer>,
}

impl Pipeline {
    fn source_path(&self, path: &str) -> PathBuf {
        self.src_dir.join(path)
    }

    async fn read_text(&self, path: &str) -> PressResult<String> {
        let bytes = self.sources.read_contents(&self.source_path(path)).await?;
        String::from_utf8(bytes).map_err(|e| PressError::Compression {
            path: path.to_string(),
            excerpt: String::new(),
            reason: format!("source is not valid UTF-8: {}", e.utf8_error()),
        })
    }

    async fn build(&self, sources: &[SourceRef]) -> PressResult<Artifact> {
        let mut parts = Vec::with_capacity(sources.len());
        for source in sources {
            let mut text = self.read_text(&source.path).await?;
            if source.render {
                text = self.renderer.render(&source.path, &text)?;
            }
            if source.minify {
                text = self.minifier.minify(self.kind, &source.path, &text)?;
            }
            parts.push(text);
        }
        Ok(Artifact::new(self.kind, parts.join("\n").into_bytes()))
    }
}

/// Aggregation pipeline for one asset kind
pub struct Compressor {
    pipeline: Pipeline,
    resolver: Arc<dyn FileResolver>,
    store: Arc<ArtifactStore>,
    strategy: CachingStrategy,
    retention: Duration,
}

impl Compressor {
    /// Create the compressor for `kind` from configuration and collaborators
    pub fn new(kind: AssetKind, config: &Config, collab: &Collaborators) -> Self {
        let src_dir = PathBuf::from(config.asset(kind).src_dir());
        let resolver = GlobResolver::new(config.general.root.join(&src_dir));
        Self {
            pipeline: Pipeline {
                kind,
                src_dir,
                sources: Arc::clone(&collab.sources),
                minifier: Arc::clone(&collab.minifier),
                renderer: Arc::clone(&collab.renderer),
            },
            resolver: Arc::new(resolver),
            store: Arc::clone(&collab.store),
            strategy: config.compression.caching,
            retention: config.compression.retention(),
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.pipeline.kind
    }

    /// Source directory, relative to the project root
    pub fn src_dir(&self) -> &Path {
        &self.pipeline.src_dir
    }

    pub fn strategy(&self) -> CachingStrategy {
        self.strategy
    }

    /// Artifact store shared with the serving layer
    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Expand a source specification into relative paths
    ///
    /// Directory walking runs on the blocking pool.
    pub async fn resolve(&self, spec: &str, optional: bool) -> PressResult<Vec<String>> {
        let resolver = Arc::clone(&self.resolver);
        let kind = self.kind();
        let owned = spec.to_string();
        tokio::task::spawn_blocking(move || resolver.resolve(kind, &owned, optional))
            .await
            .map_err(|e| PressError::Internal(format!("resolving {} failed: {}", spec, e)))?
    }

    /// Fail with `SourceNotFound` unless `source` exists (external sources pass)
    pub async fn check_exists(&self, source: &SourceRef) -> PressResult<()> {
        if source.is_external() {
            return Ok(());
        }
        if self
            .pipeline
            .sources
            .exists(&self.pipeline.source_path(&source.path))
            .await
        {
            Ok(())
        } else {
            Err(PressError::SourceNotFound {
                kind: self.kind(),
                path: source.path.clone(),
            })
        }
    }

    /// Key for `sources` under the configured strategy
    pub async fn key_for(&self, sources: &[SourceRef]) -> PressResult<CacheKey> {
        let stamps = if self.strategy.uses_timestamps() {
            let mtimes = try_join_all(sources.iter().map(|source| {
                let path = self.pipeline.source_path(&source.path);
                let store = Arc::clone(&self.pipeline.sources);
                async move { store.last_modified(&path).await }
            }))
            .await?;
            sources
                .iter()
                .zip(mtimes)
                .map(|(source, modified)| SourceStamp::new(source, modified))
                .collect::<Vec<_>>()
        } else {
            sources.iter().map(SourceStamp::unstamped).collect()
        };
        Ok(key::derive_key(self.kind(), &stamps, self.strategy))
    }

    /// Build (or reuse) the artifact for a closed request's sources
    ///
    /// Returns the key the artifact is stored under. Concurrent closes of
    /// the same source list compute the artifact once.
    pub async fn close_request(&self, sources: Vec<SourceRef>) -> PressResult<CacheKey> {
        let key = self.key_for(&sources).await?;
        let ttl = if self.strategy.uses_timestamps() {
            None
        } else {
            Some(self.retention)
        };

        let pipeline = self.pipeline.clone();
        let count = sources.len();
        let factory = move || async move { pipeline.build(&sources).await };

        match self.strategy {
            CachingStrategy::Never => self.store.recompute(&key, ttl, factory).await?,
            CachingStrategy::Always | CachingStrategy::Change => {
                self.store.compute_if_absent(&key, ttl, factory).await?
            }
        };

        debug!("Closed {} request with {} source(s) as {}", self.kind(), count, key);
        Ok(key)
    }

    /// Build (or reuse) an artifact holding exactly one source
    pub async fn compressed_single_file_key(&self, source: &SourceRef) -> PressResult<CacheKey> {
        debug!("Compressing single {} file {}", self.kind(), source.path);
        self.close_request(vec![source.clone()]).await
    }

    /// Render one source for direct serving, without minifying
    ///
    /// Paths that would leave the source directory, including through a
    /// symlink, read as not found.
    pub async fn render_source(&self, file: &str) -> PressResult<String> {
        let not_found = || PressError::SourceNotFound {
            kind: self.kind(),
            path: file.to_string(),
        };

        let escapes = file.is_empty()
            || Path::new(file)
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(not_found());
        }

        let source = SourceRef::new(self.kind(), file, false, true);
        self.check_exists(&source).await.map_err(|_| not_found())?;
        let inside = self
            .pipeline
            .sources
            .contains(&self.pipeline.src_dir, &self.pipeline.source_path(file))
            .await;
        if !inside {
            return Err(not_found());
        }

        let text = self.pipeline.read_text(file).await?;
        self.pipeline.renderer.render(file, &text)
    }
}
