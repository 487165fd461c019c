//! Wires a [`UiManager`] to the script runtime and the platform.
//!
//! The scheduler owns the event dispatcher, pipes events into the runtime's
//! `dispatchEvent` function and state updates back into the UI manager, and
//! tells the platform when a surface has a transaction ready to mount.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Instant;

use crate::component_descriptor::ComponentDescriptorRegistry;
use crate::config::RendererConfig;
use crate::error::UiManagerError;
use crate::event::{
    asynchronous_beat_factory, synchronous_beat_factory, EventBeatFactory, EventDispatcher,
    EventPipe, RawEvent, StatePipe,
};
use crate::hash::HashMap;
use crate::mounting::{MountingCoordinator, ShadowView};
use crate::props::Props;
use crate::raw_value::RawValue;
use crate::runtime::{handle_runtime_error, RuntimeExecutor, ScriptRuntime};
use crate::shadow_node::{ShadowNode, SharedChildren};
use crate::state::StateUpdate;
use crate::ui_manager::{UiManager, UiManagerDelegate};
use crate::SurfaceId;

/// Script function that receives every flushed event as
/// `(instanceHandle, type, payload)`.
pub const DISPATCH_EVENT_FUNCTION: &str = "dispatchEvent";

/// Everything a [`Scheduler`] needs from its host.
#[derive(Clone)]
pub struct SchedulerToolbox {
    pub runtime_executor: Arc<dyn RuntimeExecutor>,
    pub synchronous_beat_factory: EventBeatFactory,
    pub asynchronous_beat_factory: EventBeatFactory,
    pub component_registry: Arc<ComponentDescriptorRegistry>,
    pub config: RendererConfig,
}

impl SchedulerToolbox {
    /// Toolbox whose beats only fire when induced.
    pub fn new(
        runtime_executor: Arc<dyn RuntimeExecutor>,
        component_registry: Arc<ComponentDescriptorRegistry>,
    ) -> Self {
        Self {
            synchronous_beat_factory: synchronous_beat_factory(Arc::clone(&runtime_executor)),
            asynchronous_beat_factory: asynchronous_beat_factory(Arc::clone(&runtime_executor)),
            runtime_executor,
            component_registry,
            config: RendererConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RendererConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_beat_factories(
        mut self,
        synchronous: EventBeatFactory,
        asynchronous: EventBeatFactory,
    ) -> Self {
        self.synchronous_beat_factory = synchronous;
        self.asynchronous_beat_factory = asynchronous;
        self
    }
}

impl fmt::Debug for SchedulerToolbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerToolbox")
            .field("component_registry", &self.component_registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Platform side of the scheduler.
pub trait SchedulerDelegate: Send + Sync {
    /// A transaction is ready to be pulled from `coordinator`.
    fn scheduler_did_finish_transaction(&self, coordinator: &Arc<MountingCoordinator>);

    /// A node was created; the platform may build its view ahead of the
    /// mount that inserts it.
    fn scheduler_did_request_preliminary_view_allocation(
        &self,
        surface_id: SurfaceId,
        view: &ShadowView,
    );
}

pub struct Scheduler {
    ui_manager: Arc<UiManager>,
    event_dispatcher: Arc<EventDispatcher>,
    runtime_executor: Arc<dyn RuntimeExecutor>,
    coordinators: RwLock<HashMap<SurfaceId, Arc<MountingCoordinator>>>,
    delegate: Weak<dyn SchedulerDelegate>,
}

impl Scheduler {
    pub fn new(toolbox: SchedulerToolbox, delegate: Weak<dyn SchedulerDelegate>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self: &Weak<Self>| {
            let ui_manager = UiManager::new(toolbox.component_registry, toolbox.config.clone());
            let ui_manager_delegate: Weak<dyn UiManagerDelegate> = weak_self.clone();
            ui_manager.set_delegate(ui_manager_delegate);

            let fatal_error_handler = Arc::clone(toolbox.config.fatal_error_handler());
            let event_pipe: EventPipe =
                Arc::new(move |runtime: &mut dyn ScriptRuntime, event: &RawEvent| {
                    let instance_handle = event
                        .target
                        .as_ref()
                        .map_or(RawValue::Null, |target| {
                            RawValue::from(target.instance_handle())
                        });
                    let args = [
                        instance_handle,
                        RawValue::from(event.event_type.as_str()),
                        event.payload.clone(),
                    ];
                    if let Err(error) = runtime.call_function(DISPATCH_EVENT_FUNCTION, &args) {
                        handle_runtime_error(runtime, &error, &fatal_error_handler);
                    }
                });

            let weak_ui_manager = Arc::downgrade(&ui_manager);
            let state_pipe: StatePipe = Arc::new(move |update: StateUpdate| {
                match weak_ui_manager.upgrade() {
                    Some(ui_manager) => {
                        ui_manager.update_state(update);
                    }
                    None => log::trace!("state update dropped: UI manager released"),
                }
            });

            let event_dispatcher = Arc::new(EventDispatcher::new(
                event_pipe,
                state_pipe,
                &toolbox.synchronous_beat_factory,
                &toolbox.asynchronous_beat_factory,
            ));
            ui_manager.set_event_dispatcher(Arc::downgrade(&event_dispatcher));

            Self {
                ui_manager,
                event_dispatcher,
                runtime_executor: toolbox.runtime_executor,
                coordinators: RwLock::new(HashMap::new()),
                delegate,
            }
        })
    }

    pub fn ui_manager(&self) -> &Arc<UiManager> {
        &self.ui_manager
    }

    pub fn event_dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.event_dispatcher
    }

    pub fn runtime_executor(&self) -> &Arc<dyn RuntimeExecutor> {
        &self.runtime_executor
    }

    pub fn start_surface(&self, surface_id: SurfaceId) -> Result<(), UiManagerError> {
        self.ui_manager.start_surface(surface_id)?;
        if let Some(coordinator) = self.ui_manager.mounting_coordinator(surface_id) {
            self.coordinators
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(surface_id, coordinator);
        }
        Ok(())
    }

    /// Stops the surface. The platform is told about the teardown
    /// transaction before this returns.
    pub fn stop_surface(
        &self,
        surface_id: SurfaceId,
    ) -> Result<Arc<MountingCoordinator>, UiManagerError> {
        let coordinator = self.ui_manager.stop_surface(surface_id)?;
        self.coordinators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&surface_id);
        Ok(coordinator)
    }

    pub fn mounting_coordinator(&self, surface_id: SurfaceId) -> Option<Arc<MountingCoordinator>> {
        self.coordinators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&surface_id)
            .cloned()
    }

    pub fn running_surfaces(&self) -> Vec<SurfaceId> {
        let mut surfaces: Vec<SurfaceId> = self
            .coordinators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        surfaces.sort_unstable();
        surfaces
    }
}

impl UiManagerDelegate for Scheduler {
    fn ui_manager_did_finish_transaction(
        &self,
        surface_id: SurfaceId,
        _root_children: &SharedChildren,
        commit_start_time: Option<Instant>,
    ) {
        let Some(coordinator) = self.mounting_coordinator(surface_id) else {
            log::debug!("surface {surface_id}: finished transaction for an unknown surface");
            return;
        };
        if let Some(start) = commit_start_time {
            log::trace!("surface {surface_id}: commit took {:?}", start.elapsed());
        }
        if let Some(delegate) = self.delegate.upgrade() {
            delegate.scheduler_did_finish_transaction(&coordinator);
        }
    }

    fn ui_manager_did_create_shadow_node(&self, node: &ShadowNode) {
        let props = node.props();
        if !props.forms_view() && !props.forms_stacking_context() {
            return;
        }
        if let Some(delegate) = self.delegate.upgrade() {
            delegate.scheduler_did_request_preliminary_view_allocation(
                node.surface_id(),
                &ShadowView::new(node),
            );
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for surface_id in self.running_surfaces() {
            log::warn!("surface {surface_id}: still running when the scheduler was dropped");
            if let Err(error) = self.ui_manager.stop_surface(surface_id) {
                log::debug!("surface {surface_id}: {error}");
            }
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("surfaces", &self.running_surfaces())
            .finish_non_exhaustive()
    }
}
