use std::sync::Arc;

use crate::family::InstanceHandle;
use crate::raw_value::RawValue;
use crate::{SurfaceId, Tag};

/// The script-side receiver of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventTarget {
    tag: Tag,
    surface_id: SurfaceId,
    instance_handle: InstanceHandle,
}

impl EventTarget {
    pub fn new(tag: Tag, surface_id: SurfaceId, instance_handle: InstanceHandle) -> Self {
        Self {
            tag,
            surface_id,
            instance_handle,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn instance_handle(&self) -> InstanceHandle {
        self.instance_handle
    }
}

/// Which queue an event or state update goes through.
///
/// Synchronous priorities run their beat on the caller's behalf and wait for
/// it; unbatched priorities fire the beat straight from the enqueue call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventPriority {
    SynchronousUnbatched,
    SynchronousBatched,
    AsynchronousUnbatched,
    #[default]
    AsynchronousBatched,
}

impl EventPriority {
    pub const ALL: [EventPriority; 4] = [
        EventPriority::SynchronousUnbatched,
        EventPriority::SynchronousBatched,
        EventPriority::AsynchronousUnbatched,
        EventPriority::AsynchronousBatched,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            EventPriority::SynchronousUnbatched => 0,
            EventPriority::SynchronousBatched => 1,
            EventPriority::AsynchronousUnbatched => 2,
            EventPriority::AsynchronousBatched => 3,
        }
    }

    pub fn is_synchronous(self) -> bool {
        matches!(
            self,
            EventPriority::SynchronousUnbatched | EventPriority::SynchronousBatched
        )
    }

    pub fn is_batched(self) -> bool {
        matches!(
            self,
            EventPriority::SynchronousBatched | EventPriority::AsynchronousBatched
        )
    }
}

/// An event waiting in an [`crate::EventQueue`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub event_type: String,
    pub payload: RawValue,
    pub target: Option<Arc<EventTarget>>,
}

impl RawEvent {
    pub fn new(
        event_type: impl Into<String>,
        payload: RawValue,
        target: Option<Arc<EventTarget>>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            target,
        }
    }

    /// Whether `other` would be delivered to the same receiver under the
    /// same name.
    pub fn is_same_kind(&self, other: &RawEvent) -> bool {
        self.event_type == other.event_type && self.target == other.target
    }
}
