use std::fmt;
use std::sync::{Arc, Weak};

use crate::event::{EventDispatcher, EventEmitter, EventTarget};
use crate::state::StateCoordinator;
use crate::{ComponentHandle, ComponentName, SurfaceId, Tag};

/// Opaque handle of the script-side instance that owns a node.
pub type InstanceHandle = u64;

/// Identity shared by every clone of a node.
pub struct ShadowNodeFamily {
    tag: Tag,
    surface_id: SurfaceId,
    component_handle: ComponentHandle,
    component_name: ComponentName,
    instance_handle: Option<InstanceHandle>,
    event_emitter: Option<Arc<EventEmitter>>,
    state_coordinator: Arc<StateCoordinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowNodeFamilyFragment {
    pub tag: Tag,
    pub surface_id: SurfaceId,
    pub instance_handle: Option<InstanceHandle>,
}

impl ShadowNodeFamily {
    pub fn new(
        fragment: ShadowNodeFamilyFragment,
        component_handle: ComponentHandle,
        component_name: ComponentName,
        event_dispatcher: Weak<EventDispatcher>,
    ) -> Self {
        let event_emitter = fragment.instance_handle.map(|instance_handle| {
            Arc::new(EventEmitter::new(
                Arc::new(EventTarget::new(
                    fragment.tag,
                    fragment.surface_id,
                    instance_handle,
                )),
                event_dispatcher.clone(),
            ))
        });
        Self {
            tag: fragment.tag,
            surface_id: fragment.surface_id,
            component_handle,
            component_name,
            instance_handle: fragment.instance_handle,
            event_emitter,
            state_coordinator: Arc::new(StateCoordinator::new(event_dispatcher)),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn component_handle(&self) -> ComponentHandle {
        self.component_handle
    }

    pub fn component_name(&self) -> ComponentName {
        self.component_name
    }

    pub fn instance_handle(&self) -> Option<InstanceHandle> {
        self.instance_handle
    }

    pub fn event_emitter(&self) -> Option<&Arc<EventEmitter>> {
        self.event_emitter.as_ref()
    }

    pub fn state_coordinator(&self) -> &Arc<StateCoordinator> {
        &self.state_coordinator
    }
}

impl fmt::Debug for ShadowNodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowNodeFamily")
            .field("tag", &self.tag)
            .field("surface_id", &self.surface_id)
            .field("component_name", &self.component_name)
            .finish_non_exhaustive()
    }
}
