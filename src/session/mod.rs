//! Request-scoped sessions
//!
//! Each in-flight request owns exactly one `RequestSession`, stored in a
//! task-local slot for the duration of `scope`. Rendering code reaches it
//! through the functions below rather than threading it through every call.
//! The session is dropped when the scoped future completes or is dropped,
//! so no per-request state outlives its request.

pub mod guard;
pub mod state;

pub use guard::DuplicateGuard;
pub use state::RequestSession;

use crate::error::{PressError, PressResult};
use chrono::Utc;
use std::cell::RefCell;
use std::future::Future;
use tracing::debug;
use uuid::Uuid;

tokio::task_local! {
    static CURRENT: RefCell<RequestSession>;
}

/// Run `fut` with a fresh session as the current request's session
pub async fn scope<F: Future>(fut: F) -> F::Output {
    let session = RequestSession::new();
    let id = session.id();
    let started_at = session.started_at();
    debug!(session = %id, "Request scope opened");

    let output = CURRENT.scope(RefCell::new(session), fut).await;

    let elapsed_ms = (Utc::now() - started_at).num_milliseconds();
    debug!(session = %id, elapsed_ms, "Request scope closed");
    output
}

/// Whether a request scope is active on this task
pub fn is_active() -> bool {
    CURRENT.try_with(|_| ()).is_ok()
}

/// Run `f` against the current session
pub fn with_current<R>(f: impl FnOnce(&mut RequestSession) -> R) -> PressResult<R> {
    CURRENT
        .try_with(|cell| f(&mut cell.borrow_mut()))
        .map_err(|_| PressError::NoActiveSession)
}

/// ID of the current session, if any
pub fn current_id() -> Option<Uuid> {
    with_current(|session| session.id()).ok()
}

/// Disable aggregation for the rest of the current request
///
/// Hosts call this when request handling fails outside Press.
pub fn mark_error() {
    if with_current(|session| session.mark_error()).is_ok() {
        debug!("Aggregation disabled for the rest of the request");
    }
}

/// Whether aggregation is disabled for the current request
///
/// Outside a request scope there is nothing to aggregate into, so this
/// reports `true`.
pub fn error_occurred() -> bool {
    with_current(|session| session.error_occurred()).unwrap_or(true)
}
