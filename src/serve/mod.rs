//! Artifact serving
//!
//! `ServingLayer` answers the second HTTP request a page triggers: the
//! browser fetching an artifact by key. It never waits for an in-progress
//! computation and never fails: an unknown, expired or mismatched key gets
//! a commented placeholder instead of an error status.

pub mod routes;

pub use routes::{request_scope, router, run_server};

use crate::asset::AssetKind;
use crate::error::PressError;
use crate::key;
use crate::press::Press;
use crate::store::ArtifactStore;
use crate::strategy::CachingStrategy;
use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// One year, in seconds
const FAR_FUTURE_SECS: u64 = 31_536_000;

/// Fixed validator for content-addressed artifacts
const LAST_MODIFIED: &str = "Fri, 01 Jan 2010 00:00:00 GMT";

/// A framework-neutral response
#[derive(Debug)]
pub struct ServeResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ServeResponse {
    fn new(status: StatusCode, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, "text/plain; charset=utf-8", body.into())
    }

    /// Body as UTF-8 text (lossy)
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl IntoResponse for ServeResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Serves artifacts, rendered sources and the clear-cache operation
pub struct ServingLayer {
    press: Arc<Press>,
    strategy: CachingStrategy,
    retention_secs: u64,
    placeholder_status: StatusCode,
    cache_clear_enabled: bool,
}

impl ServingLayer {
    pub fn new(press: Arc<Press>) -> Self {
        let compression = &press.config().compression;
        let placeholder_status =
            StatusCode::from_u16(compression.placeholder_status).unwrap_or_else(|_| {
                warn!(
                    "Invalid placeholder status {}, using 200",
                    compression.placeholder_status
                );
                StatusCode::OK
            });
        Self {
            strategy: compression.caching,
            retention_secs: compression.key_storage_secs,
            placeholder_status,
            cache_clear_enabled: compression.cache_clear_enabled,
            press,
        }
    }

    fn store(&self) -> &Arc<ArtifactStore> {
        self.press.store()
    }

    /// Serve the artifact stored under `key`
    ///
    /// `key` is the escaped query value; `if_modified_since` is the raw
    /// request header, if any.
    pub async fn fetch(
        &self,
        kind: AssetKind,
        key: Option<&str>,
        if_modified_since: Option<&str>,
    ) -> ServeResponse {
        let Some(key) = key.and_then(key::unescape) else {
            warn!("{} artifact requested without a usable key", kind);
            return self.placeholder(kind);
        };
        if key.kind() != Some(kind) {
            warn!("Key {} does not name a {} artifact", key, kind);
            return self.placeholder(kind);
        }

        let artifact = match self.store().get(&key).await {
            Ok(Some(artifact)) => artifact,
            Ok(None) => {
                warn!("{} artifact {} not found", kind, key);
                return self.placeholder(kind);
            }
            Err(e) => {
                error!("Looking up artifact {} failed: {}", key, e);
                return self.placeholder(kind);
            }
        };

        let mut response = ServeResponse::new(StatusCode::OK, kind.content_type(), Vec::new());
        if self.strategy.browser_cacheable() {
            self.long_lived_headers(&mut response.headers);
            if if_modified_since.is_some_and(|v| httpdate::parse_http_date(v).is_ok()) {
                debug!("{} artifact {} not modified", kind, key);
                response.status = StatusCode::NOT_MODIFIED;
                response.headers.remove(header::CONTENT_TYPE);
                return response;
            }
        }

        debug!("Serving {} artifact {} ({} bytes)", kind, key, artifact.len());
        response.body = artifact.bytes.clone();
        response
    }

    fn long_lived_headers(&self, headers: &mut HeaderMap) {
        let expires =
            httpdate::fmt_http_date(SystemTime::now() + Duration::from_secs(FAR_FUTURE_SECS));
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("max-age=31536000"),
        );
        if let Ok(value) = HeaderValue::from_str(&expires) {
            headers.insert(header::EXPIRES, value);
        }
        headers.insert(header::LAST_MODIFIED, HeaderValue::from_static(LAST_MODIFIED));
    }

    /// Commented stand-in for an artifact that is not available
    pub fn placeholder(&self, kind: AssetKind) -> ServeResponse {
        let body = format!(
            "/*\n\
             PLACEHOLDER: the combined {kind} file could not be generated.\n\
             This happens in one of two situations:\n\
             1. The browser requested the file longer after the page was rendered \
             than the server keeps artifacts (currently {secs} seconds).\n\
             2. An error occurred while the page was being rendered.\n\
             */\n",
            kind = kind,
            secs = self.retention_secs,
        );
        ServeResponse::new(self.placeholder_status, kind.content_type(), body)
    }

    /// Serve one source after template rendering
    pub async fn rendered(&self, kind: AssetKind, file: Option<&str>) -> ServeResponse {
        let Some(file) = file else {
            return ServeResponse::text(StatusCode::NOT_FOUND, "Not found");
        };
        match self.press.compressor(kind).render_source(file).await {
            Ok(text) => ServeResponse::new(StatusCode::OK, kind.content_type(), text),
            Err(PressError::SourceNotFound { .. }) => {
                debug!("Refused rendered {} request for {}", kind, file);
                ServeResponse::text(StatusCode::NOT_FOUND, "Not found")
            }
            Err(e) => {
                error!("Rendering {} failed: {}", file, e);
                ServeResponse::text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }

    /// Clear every stored artifact, if the operation is enabled
    pub async fn clear_cache(&self) -> ServeResponse {
        if !self.cache_clear_enabled {
            return ServeResponse::text(StatusCode::FORBIDDEN, "Cache clearing is disabled");
        }
        match self.store().clear().await {
            Ok(count) => {
                info!("Cleared {} artifact(s) on request", count);
                ServeResponse::text(
                    StatusCode::OK,
                    format!("Cleared {} artifacts from cache", count),
                )
            }
            Err(e) => {
                error!("Clearing artifacts failed: {}", e);
                ServeResponse::text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }
}
