//! Platform stand-in that mounts into [`StubViewTree`]s.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fabric_core::{
    MountingCoordinator, RevisionNumber, SchedulerDelegate, ShadowView, StubViewTree, SurfaceId,
    Tag,
};

#[derive(Default)]
struct Recorded {
    finished: Vec<SurfaceId>,
    preallocated: Vec<(SurfaceId, Tag)>,
    mounted: BTreeMap<SurfaceId, Vec<RevisionNumber>>,
    views: BTreeMap<SurfaceId, StubViewTree>,
}

/// Records what the scheduler reports. With auto-mount enabled every
/// finished transaction is pulled right away and applied to a stub view
/// tree for its surface.
#[derive(Default)]
pub struct RecordingSchedulerDelegate {
    auto_mount: bool,
    recorded: Mutex<Recorded>,
}

impl RecordingSchedulerDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn auto_mounting() -> Arc<Self> {
        Arc::new(Self {
            auto_mount: true,
            recorded: Mutex::default(),
        })
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Surfaces of every finished transaction, in order.
    pub fn finished_transactions(&self) -> Vec<SurfaceId> {
        self.recorded().finished.clone()
    }

    pub fn preallocated_views(&self) -> Vec<(SurfaceId, Tag)> {
        self.recorded().preallocated.clone()
    }

    /// Numbers of the transactions mounted for `surface_id`.
    pub fn mounted_revisions(&self, surface_id: SurfaceId) -> Vec<RevisionNumber> {
        self.recorded()
            .mounted
            .get(&surface_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn views(&self, surface_id: SurfaceId) -> Option<StubViewTree> {
        self.recorded().views.get(&surface_id).cloned()
    }

    /// Pulls and applies whatever `coordinator` has ready.
    pub fn mount(&self, coordinator: &MountingCoordinator) {
        let Some(mut transaction) = coordinator.pull_transaction() else {
            return;
        };
        transaction.telemetry_mut().will_mount();
        let mutations = transaction.take_mutations();
        let surface_id = transaction.surface_id();
        let number = transaction.number();
        log::debug!(
            "surface {surface_id}: mounting transaction {number} ({} mutations)",
            mutations.len()
        );
        let mut recorded = self.recorded();
        let views = recorded.views.entry(surface_id).or_default();
        if let Err(error) = views.mutate(&mutations) {
            panic!("surface {surface_id}: transaction {number} failed to mount: {error}");
        }
        recorded
            .mounted
            .entry(surface_id)
            .or_default()
            .push(number);
        transaction.telemetry_mut().did_mount();
    }
}

impl SchedulerDelegate for RecordingSchedulerDelegate {
    fn scheduler_did_finish_transaction(&self, coordinator: &Arc<MountingCoordinator>) {
        self.recorded().finished.push(coordinator.surface_id());
        if self.auto_mount {
            self.mount(coordinator);
        }
    }

    fn scheduler_did_request_preliminary_view_allocation(
        &self,
        surface_id: SurfaceId,
        view: &ShadowView,
    ) {
        self.recorded().preallocated.push((surface_id, view.tag));
    }
}
