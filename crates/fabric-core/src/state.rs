//! Native-originated state attached to shadow nodes.
//!
//! A [`State`] is immutable. Native code that wants to change it asks the
//! node's [`StateCoordinator`] to dispatch an update; the update travels
//! through the event dispatcher and is applied by the next commit, which
//! clones the most recently committed node of that lineage with the new
//! state. The commit path stays the single writer of node identity.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::event::{EventDispatcher, EventPriority};
use crate::family::ShadowNodeFamily;
use crate::shadow_node::{ShadowNode, SharedShadowNode};

pub type StateData = Arc<dyn Any + Send + Sync>;

pub struct State {
    data: StateData,
    revision: u64,
    coordinator: Arc<StateCoordinator>,
}

pub type SharedState = Arc<State>;

impl State {
    /// Initial state of a lineage.
    pub fn new<D: Any + Send + Sync>(data: D, family: &ShadowNodeFamily) -> Self {
        Self {
            data: Arc::new(data),
            revision: 1,
            coordinator: Arc::clone(family.state_coordinator()),
        }
    }

    /// Successor of `previous` carrying `data`.
    pub fn next<D: Any + Send + Sync>(previous: &State, data: D) -> Self {
        Self {
            data: Arc::new(data),
            revision: previous.revision + 1,
            coordinator: Arc::clone(&previous.coordinator),
        }
    }

    pub fn data<D: Any>(&self) -> Option<&D> {
        self.data.downcast_ref::<D>()
    }

    pub fn raw_data(&self) -> &StateData {
        &self.data
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn coordinator(&self) -> &Arc<StateCoordinator> {
        &self.coordinator
    }

    /// State of the most recently committed node in this lineage.
    pub fn most_recent(&self) -> Option<SharedState> {
        self.coordinator
            .target()
            .and_then(|node| node.state().cloned())
    }

    /// Queues `data` to replace this lineage's state at the next commit.
    pub fn update_state<D>(&self, data: D, priority: EventPriority)
    where
        D: Any + Send + Sync + Clone,
    {
        let callback: StateUpdateCallback =
            Arc::new(move |previous: &SharedState| Arc::new(State::next(previous, data.clone())));
        self.coordinator.dispatch_raw_state(callback, priority);
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

/// Produces the new state from the one found on the target node. It may run
/// more than once if the commit applying it has to be retried.
pub type StateUpdateCallback = Arc<dyn Fn(&SharedState) -> SharedState + Send + Sync>;

#[derive(Clone)]
pub struct StateUpdate {
    pub family: Arc<ShadowNodeFamily>,
    pub callback: StateUpdateCallback,
}

impl fmt::Debug for StateUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateUpdate")
            .field("tag", &self.family.tag())
            .field("surface_id", &self.family.surface_id())
            .finish_non_exhaustive()
    }
}

pub struct StateCoordinator {
    target: RwLock<Weak<ShadowNode>>,
    event_dispatcher: Weak<EventDispatcher>,
}

impl StateCoordinator {
    pub fn new(event_dispatcher: Weak<EventDispatcher>) -> Self {
        Self {
            target: RwLock::new(Weak::new()),
            event_dispatcher,
        }
    }

    /// The most recently committed node owning this state lineage.
    pub fn target(&self) -> Option<SharedShadowNode> {
        self.target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade()
    }

    pub fn set_target(&self, target: &SharedShadowNode) {
        *self.target.write().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(target);
    }

    /// Forwards an update to the event dispatcher. Does nothing when no
    /// target was ever committed or the dispatcher is gone; both happen
    /// routinely while a surface is torn down.
    pub fn dispatch_raw_state(&self, callback: StateUpdateCallback, priority: EventPriority) {
        let Some(target) = self.target() else {
            log::trace!("state update dropped: no committed target");
            return;
        };
        let Some(dispatcher) = self.event_dispatcher.upgrade() else {
            log::trace!("state update dropped: event dispatcher released");
            return;
        };
        dispatcher.dispatch_state_update(
            StateUpdate {
                family: Arc::clone(target.family()),
                callback,
            },
            priority,
        );
    }
}

impl fmt::Debug for StateCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCoordinator")
            .field("has_target", &self.target().is_some())
            .finish_non_exhaustive()
    }
}
