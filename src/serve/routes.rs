//! HTTP surface
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /compressed/{js,css}?key=` | combined artifact |
//! | `GET /compressed/{js,css}/single?key=` | single-file artifact |
//! | `GET /compressed/rendered/{js,css}?file=` | rendered source |
//! | `GET /compressed/clear` | clear-cache |

use super::ServingLayer;
use crate::asset::AssetKind;
use crate::error::{PressError, PressResult};
use crate::tags::Route;
use axum::extract::{Query, Request, State};
use axum::http::header::{HeaderMap, IF_MODIFIED_SINCE};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
struct ArtifactQuery {
    key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderedQuery {
    file: Option<String>,
}

type Shared = State<Arc<ServingLayer>>;

/// Run the rest of the request inside a fresh Press session
pub async fn request_scope(request: Request, next: Next) -> Response {
    crate::session::scope(next.run(request)).await
}

/// Router serving every Press route
pub fn router(serving: Arc<ServingLayer>) -> Router {
    let mut router: Router<Arc<ServingLayer>> = Router::new();

    for &kind in AssetKind::all() {
        router = router
            .route(
                &Route::Compressed(kind).path(),
                get(move |state: Shared, query: Query<ArtifactQuery>, headers: HeaderMap| {
                    artifact(kind, state, query, headers)
                }),
            )
            .route(
                &Route::SingleCompressed(kind).path(),
                get(move |state: Shared, query: Query<ArtifactQuery>, headers: HeaderMap| {
                    artifact(kind, state, query, headers)
                }),
            )
            .route(
                &Route::Rendered(kind).path(),
                get(move |state: Shared, query: Query<RenderedQuery>| rendered(kind, state, query)),
            );
    }

    router
        .route(&Route::ClearCache.path(), get(clear))
        .layer(middleware::from_fn(request_scope))
        .with_state(serving)
}

async fn artifact(
    kind: AssetKind,
    State(serving): Shared,
    Query(query): Query<ArtifactQuery>,
    headers: HeaderMap,
) -> Response {
    let if_modified_since = headers
        .get(IF_MODIFIED_SINCE)
        .and_then(|value| value.to_str().ok());
    serving
        .fetch(kind, query.key.as_deref(), if_modified_since)
        .await
        .into_response()
}

async fn rendered(kind: AssetKind, State(serving): Shared, Query(query): Query<RenderedQuery>) -> Response {
    serving
        .rendered(kind, query.file.as_deref())
        .await
        .into_response()
}

async fn clear(State(serving): Shared) -> Response {
    serving.clear_cache().await.into_response()
}

/// Bind `addr` and serve until ctrl-c
pub async fn run_server(addr: &str, serving: Arc<ServingLayer>) -> PressResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| PressError::io(format!("binding {}", addr), e))?;
    let local = listener
        .local_addr()
        .map_err(|e| PressError::io("reading listen address", e))?;
    info!("Serving artifacts on http://{}", local);

    axum::serve(listener, router(serving))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PressError::Server(e.to_string()))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
