use std::fmt;
use std::sync::Arc;

use crate::event::EventEmitter;
use crate::props::SharedProps;
use crate::shadow_node::ShadowNode;
use crate::state::SharedState;
use crate::{ComponentHandle, ComponentName, SurfaceId, Tag};

/// What the platform needs to know about one node: identity plus the props
/// and state it should display.
#[derive(Clone)]
pub struct ShadowView {
    pub component_name: ComponentName,
    pub component_handle: ComponentHandle,
    pub surface_id: SurfaceId,
    pub tag: Tag,
    pub props: SharedProps,
    pub state: Option<SharedState>,
    pub event_emitter: Option<Arc<EventEmitter>>,
}

impl ShadowView {
    pub fn new(node: &ShadowNode) -> Self {
        Self {
            component_name: node.component_name(),
            component_handle: node.component_handle(),
            surface_id: node.surface_id(),
            tag: node.tag(),
            props: Arc::clone(node.props()),
            state: node.state().cloned(),
            event_emitter: node.family().event_emitter().cloned(),
        }
    }
}

impl From<&ShadowNode> for ShadowView {
    fn from(node: &ShadowNode) -> Self {
        ShadowView::new(node)
    }
}

fn same_arc<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Props, state and emitter compare by identity.
impl PartialEq for ShadowView {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.surface_id == other.surface_id
            && self.component_handle == other.component_handle
            && Arc::ptr_eq(&self.props, &other.props)
            && same_arc(&self.state, &other.state)
            && same_arc(&self.event_emitter, &other.event_emitter)
    }
}

impl fmt::Debug for ShadowView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowView")
            .field("tag", &self.tag)
            .field("component_name", &self.component_name)
            .field("surface_id", &self.surface_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Delete,
    Insert,
    Remove,
    Update,
}

/// One instruction for the platform view hierarchy. Lists of these must be
/// applied in order; insert and remove indices assume every earlier
/// instruction has already run.
#[derive(Debug, Clone, PartialEq)]
pub enum ShadowViewMutation {
    Create {
        new: ShadowView,
    },
    Delete {
        old: ShadowView,
    },
    Insert {
        parent: ShadowView,
        new: ShadowView,
        index: usize,
    },
    Remove {
        parent: ShadowView,
        old: ShadowView,
        index: usize,
    },
    Update {
        old: ShadowView,
        new: ShadowView,
    },
}

impl ShadowViewMutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            ShadowViewMutation::Create { .. } => MutationKind::Create,
            ShadowViewMutation::Delete { .. } => MutationKind::Delete,
            ShadowViewMutation::Insert { .. } => MutationKind::Insert,
            ShadowViewMutation::Remove { .. } => MutationKind::Remove,
            ShadowViewMutation::Update { .. } => MutationKind::Update,
        }
    }

    pub fn target_tag(&self) -> Tag {
        match self {
            ShadowViewMutation::Create { new }
            | ShadowViewMutation::Insert { new, .. }
            | ShadowViewMutation::Update { new, .. } => new.tag,
            ShadowViewMutation::Delete { old } | ShadowViewMutation::Remove { old, .. } => old.tag,
        }
    }

    pub fn parent_tag(&self) -> Option<Tag> {
        match self {
            ShadowViewMutation::Insert { parent, .. }
            | ShadowViewMutation::Remove { parent, .. } => Some(parent.tag),
            _ => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            ShadowViewMutation::Insert { index, .. } | ShadowViewMutation::Remove { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }

    /// The snapshot the platform should end up with, if any.
    pub fn new_view(&self) -> Option<&ShadowView> {
        match self {
            ShadowViewMutation::Create { new }
            | ShadowViewMutation::Insert { new, .. }
            | ShadowViewMutation::Update { new, .. } => Some(new),
            _ => None,
        }
    }
}

impl fmt::Display for ShadowViewMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShadowViewMutation::Create { new } => {
                write!(f, "Create [{}] {}", new.tag, new.component_name)
            }
            ShadowViewMutation::Delete { old } => write!(f, "Delete [{}]", old.tag),
            ShadowViewMutation::Insert { parent, new, index } => {
                write!(f, "Insert [{}] into [{}] at {}", new.tag, parent.tag, index)
            }
            ShadowViewMutation::Remove { parent, old, index } => {
                write!(f, "Remove [{}] from [{}] at {}", old.tag, parent.tag, index)
            }
            ShadowViewMutation::Update { new, .. } => write!(f, "Update [{}]", new.tag),
        }
    }
}
