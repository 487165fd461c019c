//! Entry point for the script side: creates and clones nodes, commits
//! completed trees and applies state updates.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Instant;

use crate::component_descriptor::ComponentDescriptorRegistry;
use crate::config::RendererConfig;
use crate::error::UiManagerError;
use crate::event::EventDispatcher;
use crate::family::{InstanceHandle, ShadowNodeFamilyFragment};
use crate::hash::HashMap;
use crate::mounting::{MountingCoordinator, ShadowTreeRevision};
use crate::props::RawProps;
use crate::shadow_node::{ShadowNode, ShadowNodeFragment, SharedChildren, SharedShadowNode};
use crate::state::StateUpdate;
use crate::tree::{CommitOptions, CommitStatus, ShadowTree, ShadowTreeDelegate, ShadowTreeRegistry};
use crate::{SurfaceId, Tag};

/// Where a surface is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceLifecycle {
    /// Never started.
    NoTree,
    /// A render pass is building the next tree.
    TreeBuilding,
    /// The last render pass has been committed.
    TreeCommitted,
    Stopped,
}

pub trait UiManagerDelegate: Send + Sync {
    /// Called once per successful commit of any surface, before the new
    /// revision is mounted.
    fn ui_manager_did_finish_transaction(
        &self,
        surface_id: SurfaceId,
        root_children: &SharedChildren,
        commit_start_time: Option<Instant>,
    );

    /// Called for every node built from scratch; clones are not reported.
    fn ui_manager_did_create_shadow_node(&self, node: &ShadowNode);
}

pub struct UiManager {
    weak_self: Weak<UiManager>,
    component_registry: Arc<ComponentDescriptorRegistry>,
    config: RendererConfig,
    shadow_tree_registry: ShadowTreeRegistry,
    surfaces: RwLock<HashMap<SurfaceId, SurfaceLifecycle>>,
    delegate: RwLock<Option<Weak<dyn UiManagerDelegate>>>,
    event_dispatcher: RwLock<Weak<EventDispatcher>>,
}

impl UiManager {
    pub fn new(
        component_registry: Arc<ComponentDescriptorRegistry>,
        config: RendererConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            component_registry,
            config,
            shadow_tree_registry: ShadowTreeRegistry::new(),
            surfaces: RwLock::new(HashMap::new()),
            delegate: RwLock::new(None),
            event_dispatcher: RwLock::new(Weak::new()),
        })
    }

    pub fn component_registry(&self) -> &Arc<ComponentDescriptorRegistry> {
        &self.component_registry
    }

    pub fn shadow_tree_registry(&self) -> &ShadowTreeRegistry {
        &self.shadow_tree_registry
    }

    pub fn set_delegate(&self, delegate: Weak<dyn UiManagerDelegate>) {
        *self.delegate.write().unwrap_or_else(PoisonError::into_inner) = Some(delegate);
    }

    /// Dispatcher handed to the families of nodes created from now on.
    pub fn set_event_dispatcher(&self, dispatcher: Weak<EventDispatcher>) {
        *self
            .event_dispatcher
            .write()
            .unwrap_or_else(PoisonError::into_inner) = dispatcher;
    }

    fn delegate(&self) -> Option<Arc<dyn UiManagerDelegate>> {
        self.delegate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    fn event_dispatcher(&self) -> Weak<EventDispatcher> {
        self.event_dispatcher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn surface_lifecycle(&self, surface_id: SurfaceId) -> SurfaceLifecycle {
        self.surfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&surface_id)
            .copied()
            .unwrap_or(SurfaceLifecycle::NoTree)
    }

    /// Moves a running surface to `next`; fails for surfaces that are not
    /// running.
    fn transition(
        &self,
        surface_id: SurfaceId,
        next: SurfaceLifecycle,
    ) -> Result<(), UiManagerError> {
        let mut surfaces = self.surfaces.write().unwrap_or_else(PoisonError::into_inner);
        match surfaces.get_mut(&surface_id) {
            Some(SurfaceLifecycle::Stopped) => Err(UiManagerError::SurfaceStopped { surface_id }),
            Some(lifecycle) => {
                *lifecycle = next;
                Ok(())
            }
            None => Err(UiManagerError::SurfaceNotRunning { surface_id }),
        }
    }

    /// Registers a shadow tree for `surface_id`. A stopped surface may be
    /// started again.
    pub fn start_surface(&self, surface_id: SurfaceId) -> Result<(), UiManagerError> {
        {
            let mut surfaces = self.surfaces.write().unwrap_or_else(PoisonError::into_inner);
            match surfaces.get(&surface_id) {
                None | Some(SurfaceLifecycle::Stopped) => {
                    surfaces.insert(surface_id, SurfaceLifecycle::TreeBuilding);
                }
                Some(_) => return Err(UiManagerError::SurfaceAlreadyRunning { surface_id }),
            }
        }
        let delegate: Weak<dyn ShadowTreeDelegate> = self.weak_self.clone();
        self.shadow_tree_registry
            .add(ShadowTree::new(surface_id, &self.config, Some(delegate)));
        log::debug!("surface {surface_id}: started");
        Ok(())
    }

    /// Commits an empty tree so every mounted view gets removed, then
    /// unregisters the surface.
    ///
    /// The returned coordinator still holds the teardown revision; the
    /// platform pulls it to clear its views.
    pub fn stop_surface(
        &self,
        surface_id: SurfaceId,
    ) -> Result<Arc<MountingCoordinator>, UiManagerError> {
        self.transition(surface_id, SurfaceLifecycle::Stopped)?;
        self.shadow_tree_registry.visit(surface_id, |tree| {
            tree.commit_empty_tree();
        });
        let tree = self.shadow_tree_registry.remove(surface_id);
        log::debug!("surface {surface_id}: stopped");
        Ok(Arc::clone(tree.mounting_coordinator()))
    }

    pub fn mounting_coordinator(&self, surface_id: SurfaceId) -> Option<Arc<MountingCoordinator>> {
        let mut coordinator = None;
        self.shadow_tree_registry.visit(surface_id, |tree| {
            coordinator = Some(Arc::clone(tree.mounting_coordinator()));
        });
        coordinator
    }

    /// Current revision of a running surface.
    pub fn current_revision(&self, surface_id: SurfaceId) -> Option<ShadowTreeRevision> {
        let mut revision = None;
        self.shadow_tree_registry.visit(surface_id, |tree| {
            revision = Some(tree.current_revision());
        });
        revision
    }

    pub fn create_node(
        &self,
        tag: Tag,
        component_name: &str,
        surface_id: SurfaceId,
        raw_props: &RawProps,
        instance_handle: Option<InstanceHandle>,
    ) -> Result<ShadowNode, UiManagerError> {
        let descriptor = self.component_registry.at(component_name)?;
        self.transition(surface_id, SurfaceLifecycle::TreeBuilding)?;

        let family = descriptor.create_family(
            ShadowNodeFamilyFragment {
                tag,
                surface_id,
                instance_handle,
            },
            self.event_dispatcher(),
        );
        let props = descriptor.clone_props(None, raw_props);
        let state = descriptor.create_initial_state(&props, &family);
        let node = descriptor.create_shadow_node(family, props, state);
        log::trace!("surface {surface_id}: created [{tag}] {component_name}");

        if let Some(delegate) = self.delegate() {
            delegate.ui_manager_did_create_shadow_node(&node);
        }
        Ok(node)
    }

    /// Clones `node`, optionally replacing its children and applying a props
    /// delta.
    pub fn clone_node(
        &self,
        node: &ShadowNode,
        children: Option<SharedChildren>,
        raw_props: Option<&RawProps>,
    ) -> Result<ShadowNode, UiManagerError> {
        let descriptor = self.component_registry.at(node.component_name())?;
        self.transition(node.surface_id(), SurfaceLifecycle::TreeBuilding)?;

        let mut fragment = ShadowNodeFragment::new();
        if let Some(raw_props) = raw_props {
            fragment = fragment.with_props(descriptor.clone_props(Some(node.props()), raw_props));
        }
        if let Some(children) = children {
            fragment = fragment.with_children(children);
        }
        Ok(descriptor.clone_shadow_node(node, fragment))
    }

    pub fn append_child(
        &self,
        parent: &mut ShadowNode,
        child: SharedShadowNode,
    ) -> Result<(), UiManagerError> {
        let descriptor = self.component_registry.at(parent.component_name())?;
        descriptor.append_child(parent, child);
        Ok(())
    }

    /// Commits `children` as the new content of the surface root.
    pub fn complete_surface(
        &self,
        surface_id: SurfaceId,
        children: SharedChildren,
    ) -> Result<CommitStatus, UiManagerError> {
        let options = CommitOptions {
            enable_state_reconciliation: self.config.enable_state_reconciliation(),
        };
        let mut status = None;
        self.shadow_tree_registry.visit(surface_id, |tree| {
            status = Some(tree.commit(
                |old_root| {
                    Some(old_root.clone_with(
                        ShadowNodeFragment::new().with_children(Arc::clone(&children)),
                    ))
                },
                options,
            ));
        });
        let Some(status) = status else {
            return Err(match self.surface_lifecycle(surface_id) {
                SurfaceLifecycle::Stopped => UiManagerError::SurfaceStopped { surface_id },
                _ => UiManagerError::SurfaceNotRunning { surface_id },
            });
        };
        if status == CommitStatus::Succeeded {
            self.transition(surface_id, SurfaceLifecycle::TreeCommitted)?;
        }
        Ok(status)
    }

    /// Applies a state update to the node currently committed for its
    /// family. Cancelled when the surface or the node is gone.
    pub fn update_state(&self, update: StateUpdate) -> CommitStatus {
        let family = &update.family;
        let surface_id = family.surface_id();
        let options = CommitOptions {
            enable_state_reconciliation: self.config.enable_state_reconciliation(),
        };
        let mut status = CommitStatus::Cancelled;
        let found = self.shadow_tree_registry.visit(surface_id, |tree| {
            status = tree.commit(
                |old_root| {
                    let previous = old_root.find(family)?.state()?;
                    let next = (update.callback)(previous);
                    old_root.clone_tree(family, |old_node| {
                        old_node.clone_with(ShadowNodeFragment::new().with_state(Arc::clone(&next)))
                    })
                },
                options,
            );
        });
        if !found {
            log::debug!(
                "surface {surface_id}: state update for [{}] dropped, surface is gone",
                family.tag()
            );
        }
        status
    }
}

impl ShadowTreeDelegate for UiManager {
    fn shadow_tree_did_finish_transaction(&self, tree: &ShadowTree, revision: &ShadowTreeRevision) {
        if let Some(delegate) = self.delegate() {
            delegate.ui_manager_did_finish_transaction(
                tree.surface_id(),
                revision.root.shared_children(),
                revision.telemetry.commit_start_time(),
            );
        }
    }
}

impl fmt::Debug for UiManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiManager")
            .field("surfaces", &self.shadow_tree_registry.surface_ids())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "tests/ui_manager_tests.rs"]
mod tests;
