//! Recoverable error types.
//!
//! Contract violations (mutating a sealed node, removing an unknown surface,
//! taking a transaction's mutations twice) are not represented here; they
//! panic at the call site.

use std::sync::Arc;

use thiserror::Error;

use crate::{SurfaceId, Tag};

/// Errors surfaced by [`crate::UiManager`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UiManagerError {
    #[error("no component descriptor registered for `{name}`")]
    UnknownComponent { name: String },
    #[error("surface {surface_id} has been stopped")]
    SurfaceStopped { surface_id: SurfaceId },
    #[error("surface {surface_id} is not running")]
    SurfaceNotRunning { surface_id: SurfaceId },
    #[error("surface {surface_id} is already running")]
    SurfaceAlreadyRunning { surface_id: SurfaceId },
}

/// Errors produced while applying mutations to a view model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountingError {
    #[error("view {tag} already exists")]
    DuplicateTag { tag: Tag },
    #[error("view {tag} does not exist")]
    MissingView { tag: Tag },
    #[error("view {tag} is still attached to {parent}")]
    StillAttached { tag: Tag, parent: Tag },
    #[error("view {tag} still has {count} children")]
    HasChildren { tag: Tag, count: usize },
    #[error("index {index} out of bounds for {parent} with {len} children")]
    IndexOutOfBounds { parent: Tag, index: usize, len: usize },
    #[error("expected {expected} at index {index} of {parent}, found {found:?}")]
    ChildMismatch {
        parent: Tag,
        index: usize,
        expected: Tag,
        found: Option<Tag>,
    },
}

/// An exception raised by the script runtime while running a callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub message: String,
    pub stack: Option<String>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// Last-resort hook for runtime errors the runtime could not report itself.
pub type FatalErrorHandler = Arc<dyn Fn(&RuntimeError) + Send + Sync>;

pub(crate) fn default_fatal_error_handler() -> FatalErrorHandler {
    Arc::new(|error: &RuntimeError| {
        log::error!("unhandled script error: {error}");
        if let Some(stack) = &error.stack {
            log::error!("{stack}");
        }
    })
}
