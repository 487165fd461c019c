//! One surface's tree of committed revisions.
//!
//! Commits are optimistic: the transaction runs against a snapshot of the
//! current revision without holding any lock, and the result is only
//! published if no other commit landed in the meantime. A losing commit is
//! rerun against the newer revision.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::component_descriptor::ROOT_COMPONENT_NAME;
use crate::config::RendererConfig;
use crate::family::{ShadowNodeFamily, ShadowNodeFamilyFragment};
use crate::hash::component_handle_for;
use crate::mounting::{MountingCoordinator, ShadowTreeRevision, TransactionTelemetry};
use crate::props::RootProps;
use crate::shadow_node::{empty_children, ShadowNode, ShadowNodeFragment, SharedShadowNode};
use crate::SurfaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Succeeded,
    /// Another commit won the race. Only returned by
    /// [`ShadowTree::try_commit`].
    Failed,
    /// The transaction declined to produce a new root.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOptions {
    /// Bring nodes whose state lags behind their lineage up to date before
    /// publishing.
    pub enable_state_reconciliation: bool,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            enable_state_reconciliation: true,
        }
    }
}

pub trait ShadowTreeDelegate: Send + Sync {
    /// Called after every successful commit, once the new revision has been
    /// pushed to the mounting coordinator.
    fn shadow_tree_did_finish_transaction(&self, tree: &ShadowTree, revision: &ShadowTreeRevision);
}

pub struct ShadowTree {
    surface_id: SurfaceId,
    current: RwLock<ShadowTreeRevision>,
    mounting_coordinator: Arc<MountingCoordinator>,
    delegate: Option<Weak<dyn ShadowTreeDelegate>>,
    max_commit_attempts: usize,
}

impl ShadowTree {
    /// Creates a tree holding an empty `RootView` whose tag is the surface id.
    /// The initial revision is number 0 and is never pushed for mounting.
    pub fn new(
        surface_id: SurfaceId,
        config: &RendererConfig,
        delegate: Option<Weak<dyn ShadowTreeDelegate>>,
    ) -> Self {
        let family = Arc::new(ShadowNodeFamily::new(
            ShadowNodeFamilyFragment {
                tag: surface_id,
                surface_id,
                instance_handle: None,
            },
            component_handle_for(ROOT_COMPONENT_NAME),
            ROOT_COMPONENT_NAME,
            Weak::new(),
        ));
        let root = Arc::new(ShadowNode::new(
            family,
            Arc::new(RootProps::default()),
            empty_children(),
            None,
        ));
        root.seal_recursive();
        Self {
            surface_id,
            current: RwLock::new(ShadowTreeRevision {
                root,
                number: 0,
                telemetry: TransactionTelemetry::default(),
            }),
            mounting_coordinator: Arc::new(MountingCoordinator::new(
                surface_id,
                config.mounting_policy(),
                config.shadow_tree_introspection(),
            )),
            delegate,
            max_commit_attempts: config.max_commit_attempts(),
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn mounting_coordinator(&self) -> &Arc<MountingCoordinator> {
        &self.mounting_coordinator
    }

    pub fn current_revision(&self) -> ShadowTreeRevision {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn root(&self) -> SharedShadowNode {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner).root)
    }

    /// Runs `transaction` against the current root and publishes its result,
    /// retrying while concurrent commits keep winning.
    ///
    /// `transaction` may run several times and must not have side effects
    /// beyond building the new root. Panics once the configured number of
    /// attempts is exhausted.
    pub fn commit<F>(&self, transaction: F, options: CommitOptions) -> CommitStatus
    where
        F: Fn(&SharedShadowNode) -> Option<ShadowNode>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let status = self.try_commit(&transaction, options);
            if status != CommitStatus::Failed {
                return status;
            }
            if attempts >= self.max_commit_attempts {
                panic!(
                    "surface {}: commit failed after {} attempts",
                    self.surface_id, attempts
                );
            }
            log::warn!(
                "surface {}: commit lost a race, retrying (attempt {})",
                self.surface_id,
                attempts + 1
            );
        }
    }

    /// Single commit attempt.
    pub fn try_commit<F>(&self, transaction: &F, options: CommitOptions) -> CommitStatus
    where
        F: Fn(&SharedShadowNode) -> Option<ShadowNode>,
    {
        let mut telemetry = TransactionTelemetry::new();
        telemetry.will_commit();

        let old_revision = self.current_revision();
        let Some(new_root) = transaction(&old_revision.root) else {
            log::debug!("surface {}: commit cancelled", self.surface_id);
            return CommitStatus::Cancelled;
        };
        let new_root = if options.enable_state_reconciliation {
            reconcile_state(&new_root).unwrap_or(new_root)
        } else {
            new_root
        };
        let new_root = Arc::new(new_root);
        new_root.seal_recursive();

        let revision = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            if current.number != old_revision.number {
                return CommitStatus::Failed;
            }
            telemetry.did_commit();
            let revision = ShadowTreeRevision {
                root: Arc::clone(&new_root),
                number: old_revision.number + 1,
                telemetry,
            };
            *current = revision.clone();
            update_state_targets(Some(&old_revision.root), &new_root);
            self.mounting_coordinator.push(revision.clone());
            revision
        };
        log::debug!(
            "surface {}: committed revision {}",
            self.surface_id,
            revision.number
        );

        if let Some(delegate) = self.delegate.as_ref().and_then(Weak::upgrade) {
            delegate.shadow_tree_did_finish_transaction(self, &revision);
        }
        CommitStatus::Succeeded
    }

    /// Commits a root without children. Used when a surface is torn down so
    /// the platform removes every view.
    pub fn commit_empty_tree(&self) -> CommitStatus {
        self.commit(
            |old_root| {
                Some(old_root.clone_with(ShadowNodeFragment::new().with_children(empty_children())))
            },
            CommitOptions::default(),
        )
    }
}

impl fmt::Debug for ShadowTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowTree")
            .field("surface_id", &self.surface_id)
            .field(
                "revision",
                &self.current.read().unwrap_or_else(PoisonError::into_inner).number,
            )
            .finish_non_exhaustive()
    }
}

/// Clones every node whose state is older than the newest state committed
/// for its lineage, plus the ancestors of such nodes. Returns `None` when
/// nothing lags behind.
fn reconcile_state(node: &ShadowNode) -> Option<ShadowNode> {
    let mut children: Option<Vec<SharedShadowNode>> = None;
    for (index, child) in node.children().iter().enumerate() {
        if let Some(replacement) = reconcile_state(child) {
            children.get_or_insert_with(|| node.children().to_vec())[index] = Arc::new(replacement);
        }
    }
    let newer_state = node.state().and_then(|state| {
        let most_recent = state.most_recent()?;
        (most_recent.revision() > state.revision()).then_some(most_recent)
    });
    if children.is_none() && newer_state.is_none() {
        return None;
    }
    let mut fragment = ShadowNodeFragment::new();
    if let Some(children) = children {
        fragment = fragment.with_children(Arc::new(children));
    }
    if let Some(state) = newer_state {
        fragment = fragment.with_state(state);
    }
    Some(node.clone_with(fragment))
}

/// Points state coordinators at the nodes that now carry their lineage.
/// Subtrees shared with the previous root are already up to date.
fn update_state_targets(old: Option<&SharedShadowNode>, new: &SharedShadowNode) {
    if let Some(old) = old {
        if Arc::ptr_eq(old, new) {
            return;
        }
    }
    if let Some(state) = new.state() {
        state.coordinator().set_target(new);
    }
    let old_children = old.map(|old| old.children()).unwrap_or(&[]);
    for (index, child) in new.children().iter().enumerate() {
        let previous = old_children
            .get(index)
            .filter(|previous| ShadowNode::same_family(previous, child));
        update_state_targets(previous, child);
    }
}

#[cfg(test)]
#[path = "../tests/shadow_tree_tests.rs"]
mod tests;
