//! Per-request aggregation state

use crate::asset::{AssetKind, SourceRef};
use crate::error::{PressError, PressResult};
use crate::session::guard::DuplicateGuard;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug)]
struct KindState {
    guard: DuplicateGuard,
    pending: Vec<SourceRef>,
    closed: bool,
}

impl KindState {
    fn new(kind: AssetKind) -> Self {
        Self {
            guard: DuplicateGuard::new(kind),
            pending: Vec::new(),
            closed: false,
        }
    }
}

/// Sources registered by one request, per asset kind
///
/// Owned by a single request scope and never shared, so it needs no
/// internal locking.
#[derive(Debug)]
pub struct RequestSession {
    /// Unique session ID, used in log fields
    id: Uuid,

    /// When the request scope was opened
    started_at: DateTime<Utc>,

    /// Set once anything in this request failed
    error_occurred: bool,

    scripts: KindState,
    styles: KindState,
}

impl RequestSession {
    /// Create an empty session
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            error_occurred: false,
            scripts: KindState::new(AssetKind::Script),
            styles: KindState::new(AssetKind::Style),
        }
    }

    /// Session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the session was opened
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether aggregation is disabled for the rest of this request
    pub fn error_occurred(&self) -> bool {
        self.error_occurred
    }

    /// Disable aggregation for the rest of this request
    pub fn mark_error(&mut self) {
        self.error_occurred = true;
    }

    fn state(&self, kind: AssetKind) -> &KindState {
        match kind {
            AssetKind::Script => &self.scripts,
            AssetKind::Style => &self.styles,
        }
    }

    fn state_mut(&mut self, kind: AssetKind) -> &mut KindState {
        match kind {
            AssetKind::Script => &mut self.scripts,
            AssetKind::Style => &mut self.styles,
        }
    }

    /// Register a source, queueing it for the combined tag when `aggregate`
    ///
    /// Fails on a duplicate path, or when queueing after the kind's tag was
    /// already emitted.
    pub fn register(&mut self, source: SourceRef, aggregate: bool) -> PressResult<()> {
        let kind = source.kind;
        let state = self.state_mut(kind);

        if aggregate && state.closed {
            return Err(PressError::SessionClosed { kind });
        }

        state.guard.register(&source.path)?;
        if aggregate {
            state.pending.push(source);
        }
        Ok(())
    }

    /// Sources queued for `kind`, in registration order
    pub fn pending(&self, kind: AssetKind) -> &[SourceRef] {
        &self.state(kind).pending
    }

    /// Whether the tag for `kind` was already emitted
    pub fn is_closed(&self, kind: AssetKind) -> bool {
        self.state(kind).closed
    }

    /// Close `kind`, handing over its queued sources
    ///
    /// Returns `None` when `kind` was already closed in this request.
    pub fn close(&mut self, kind: AssetKind) -> Option<Vec<SourceRef>> {
        let state = self.state_mut(kind);
        if state.closed {
            return None;
        }
        state.closed = true;
        Some(std::mem::take(&mut state.pending))
    }
}

impl Default for RequestSession {
    fn default() -> Self {
        Self::new()
    }
}
