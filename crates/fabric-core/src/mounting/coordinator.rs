//! Hand-off point between the thread that commits and the thread that
//! mounts.
//!
//! Commits [`push`](MountingCoordinator::push) revisions; the platform
//! [`pull`](MountingCoordinator::pull_transaction)s transactions. Each
//! transaction is diffed against the revision that was mounted last, so
//! revisions the platform never saw are folded into the next transaction
//! instead of being replayed.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::differentiator::calculate_shadow_view_mutations;
use super::revision::{RevisionNumber, ShadowTreeRevision};
use super::shadow_view::ShadowViewMutation;
use super::stubs::{build_stub_view_tree, StubViewTree};
use super::transaction::MountingTransaction;
use crate::config::MountingPolicy;
use crate::shadow_node::SharedShadowNode;
use crate::SurfaceId;

struct CoordinatorState {
    last_mounted: Option<ShadowTreeRevision>,
    pending: VecDeque<ShadowTreeRevision>,
    last_pushed: Option<RevisionNumber>,
    revoked: bool,
    stub_view_tree: Option<StubViewTree>,
}

pub struct MountingCoordinator {
    surface_id: SurfaceId,
    policy: MountingPolicy,
    state: Mutex<CoordinatorState>,
    signal: Condvar,
    in_flight: Arc<AtomicBool>,
}

impl MountingCoordinator {
    pub fn new(surface_id: SurfaceId, policy: MountingPolicy, introspection: bool) -> Self {
        Self {
            surface_id,
            policy,
            state: Mutex::new(CoordinatorState {
                last_mounted: None,
                pending: VecDeque::new(),
                last_pushed: None,
                revoked: false,
                stub_view_tree: introspection.then(StubViewTree::new),
            }),
            signal: Condvar::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn policy(&self) -> MountingPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes a freshly committed revision. Numbers must strictly
    /// increase; pushes after [`MountingCoordinator::revoke`] are dropped.
    #[track_caller]
    pub fn push(&self, revision: ShadowTreeRevision) {
        let mut state = self.lock();
        if let Some(last) = state.last_pushed {
            assert!(
                revision.number > last,
                "surface {}: revision {} pushed after revision {}",
                self.surface_id,
                revision.number,
                last
            );
        }
        state.last_pushed = Some(revision.number);
        if state.revoked {
            log::debug!(
                "surface {}: dropping revision {} pushed after revoke",
                self.surface_id,
                revision.number
            );
            return;
        }
        if self.policy == MountingPolicy::Coalesce {
            state.pending.clear();
        }
        state.pending.push_back(revision);
        drop(state);
        self.signal.notify_all();
    }

    /// Stops handing out transactions. Pending revisions are discarded.
    pub fn revoke(&self) {
        let mut state = self.lock();
        state.revoked = true;
        state.pending.clear();
        drop(state);
        self.signal.notify_all();
    }

    pub fn is_revoked(&self) -> bool {
        self.lock().revoked
    }

    pub fn has_pending_transactions(&self) -> bool {
        !self.lock().pending.is_empty()
    }

    /// Blocks until a revision is pending, the coordinator is revoked, or
    /// `timeout` elapses. Returns whether a transaction can be pulled.
    pub fn wait_for_transaction(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .signal
            .wait_timeout_while(state, timeout, |state| {
                state.pending.is_empty() && !state.revoked
            })
            .unwrap_or_else(PoisonError::into_inner);
        !state.pending.is_empty()
    }

    pub fn last_mounted_revision_number(&self) -> Option<RevisionNumber> {
        self.lock()
            .last_mounted
            .as_ref()
            .map(|revision| revision.number)
    }

    pub fn last_mounted_root(&self) -> Option<SharedShadowNode> {
        self.lock()
            .last_mounted
            .as_ref()
            .map(|revision| Arc::clone(&revision.root))
    }

    /// Diffs the next pending revision against the last mounted one.
    ///
    /// Returns `None` when nothing is pending, after revoke, or while the
    /// previously pulled transaction is still alive. The diff runs without
    /// the coordinator lock, so commits can keep pushing meanwhile.
    pub fn pull_transaction(&self) -> Option<MountingTransaction> {
        let mut state = self.lock();
        if self.in_flight.load(Ordering::Acquire) {
            log::debug!(
                "surface {}: pull refused, previous transaction still in flight",
                self.surface_id
            );
            return None;
        }
        let revision = state.pending.pop_front()?;
        let previous = state.last_mounted.replace(revision.clone());
        let stub_view_tree = state.stub_view_tree.take();
        self.in_flight.store(true, Ordering::Release);
        drop(state);

        let mut telemetry = revision.telemetry;
        telemetry.will_diff();
        let mutations = calculate_shadow_view_mutations(
            previous.as_ref().map(|mounted| mounted.root.as_ref()),
            &revision.root,
        );
        telemetry.did_diff();

        if let Some(mut stub_view_tree) = stub_view_tree {
            self.validate(&mut stub_view_tree, &mutations, &revision);
            self.lock().stub_view_tree = Some(stub_view_tree);
        }

        log::debug!(
            "surface {}: transaction {} with {} mutations (from {:?})",
            self.surface_id,
            revision.number,
            mutations.len(),
            previous.as_ref().map(|mounted| mounted.number)
        );
        Some(MountingTransaction::new(
            self.surface_id,
            revision.number,
            mutations,
            telemetry,
            Arc::clone(&self.in_flight),
        ))
    }

    fn validate(
        &self,
        stub_view_tree: &mut StubViewTree,
        mutations: &[ShadowViewMutation],
        revision: &ShadowTreeRevision,
    ) {
        if let Err(error) = stub_view_tree.mutate(mutations) {
            log::warn!(
                "surface {}: transaction {} does not apply cleanly: {error}",
                self.surface_id,
                revision.number
            );
        }
        let expected = build_stub_view_tree(&revision.root);
        if *stub_view_tree != expected {
            log::warn!(
                "surface {}: mounted views diverge from revision {}\nmounted:\n{}expected:\n{}",
                self.surface_id,
                revision.number,
                stub_view_tree.dump(),
                expected.dump()
            );
            *stub_view_tree = expected;
        }
    }
}

impl fmt::Debug for MountingCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MountingCoordinator")
            .field("surface_id", &self.surface_id)
            .field("policy", &self.policy)
            .field("pending", &state.pending.len())
            .field("last_pushed", &state.last_pushed)
            .field("revoked", &state.revoked)
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/coordinator_tests.rs"]
mod tests;
