#![doc = r"Shadow tree, commit and mounting core of the Fabric-RS renderer."]

pub mod component_descriptor;
pub mod config;
pub mod error;
pub mod event;
pub mod family;
pub mod hash;
pub mod mounting;
pub mod props;
pub mod raw_value;
pub mod runtime;
pub mod scheduler;
pub mod sealable;
pub mod shadow_node;
pub mod state;
pub mod tree;
pub mod ui_manager;

#[cfg(test)]
mod test_support;

pub use component_descriptor::{
    root_component_descriptor, ComponentDescriptor, ComponentDescriptorRegistry,
    ConcreteComponentDescriptor, InitialStateFactory, ROOT_COMPONENT_NAME,
};
pub use config::{MountingPolicy, RendererConfig};
pub use error::{FatalErrorHandler, MountingError, RuntimeError, UiManagerError};
pub use event::{
    normalize_event_type, AsynchronousEventBeat, BatchingPolicy, EventBeat, EventBeatFactory,
    EventDispatcher, EventEmitter, EventPriority, EventQueue, EventTarget, QueuePhase, RawEvent,
    RunLoopActivity, SynchronousEventBeat,
};
pub use family::{InstanceHandle, ShadowNodeFamily, ShadowNodeFamilyFragment};
pub use mounting::{
    build_stub_view_tree, calculate_shadow_view_mutations, MountingCoordinator,
    MountingTransaction, MutationKind, RevisionNumber, ShadowTreeRevision, ShadowView,
    ShadowViewMutation, StubView, StubViewTree, TransactionTelemetry,
};
pub use props::{props_as, BaseProps, ConcreteProps, Props, RawProps, RootProps, SharedProps};
pub use raw_value::{RawObject, RawValue};
pub use runtime::{handle_runtime_error, RuntimeExecutor, RuntimeWork, ScriptRuntime};
pub use scheduler::{Scheduler, SchedulerDelegate, SchedulerToolbox, DISPATCH_EVENT_FUNCTION};
pub use sealable::Sealable;
pub use shadow_node::{
    empty_children, ShadowNode, ShadowNodeFragment, SharedChildren, SharedShadowNode,
};
pub use state::{SharedState, State, StateCoordinator, StateUpdate, StateUpdateCallback};
pub use tree::{CommitOptions, CommitStatus, ShadowTree, ShadowTreeDelegate, ShadowTreeRegistry};
pub use ui_manager::{SurfaceLifecycle, UiManager, UiManagerDelegate};

/// Identifies a node within its surface.
pub type Tag = i32;
/// Identifies a surface. The root node of a surface uses it as its tag.
pub type SurfaceId = i32;
/// Stable hash of a component name.
pub type ComponentHandle = u64;
pub type ComponentName = &'static str;
