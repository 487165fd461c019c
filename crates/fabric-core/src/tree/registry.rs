use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::shadow_tree::ShadowTree;
use crate::hash::HashMap;
use crate::SurfaceId;

/// Owns the shadow trees of all running surfaces.
///
/// Visiting takes the shared lock; adding and removing take the exclusive
/// one. Callbacks run under the lock and must not call back into the
/// registry's writers.
#[derive(Default)]
pub struct ShadowTreeRegistry {
    trees: RwLock<HashMap<SurfaceId, ShadowTree>>,
}

impl ShadowTreeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SurfaceId, ShadowTree>> {
        self.trees.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SurfaceId, ShadowTree>> {
        self.trees.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `tree`. Panics if its surface is already registered.
    #[track_caller]
    pub fn add(&self, tree: ShadowTree) {
        let surface_id = tree.surface_id();
        let previous = self.write().insert(surface_id, tree);
        assert!(
            previous.is_none(),
            "surface {surface_id} registered twice"
        );
    }

    /// Unregisters and returns the tree of `surface_id`. Panics if there is
    /// none.
    #[track_caller]
    pub fn remove(&self, surface_id: SurfaceId) -> ShadowTree {
        match self.write().remove(&surface_id) {
            Some(tree) => tree,
            None => panic!("surface {surface_id} is not registered"),
        }
    }

    /// Calls `callback` with the tree of `surface_id`. Returns `false`
    /// without calling it when the surface is unknown.
    pub fn visit(&self, surface_id: SurfaceId, callback: impl FnOnce(&ShadowTree)) -> bool {
        let trees = self.read();
        match trees.get(&surface_id) {
            Some(tree) => {
                callback(tree);
                true
            }
            None => false,
        }
    }

    /// Calls `callback` for every tree until it sets its `stop` flag.
    pub fn enumerate(&self, mut callback: impl FnMut(&ShadowTree, &mut bool)) {
        let trees = self.read();
        let mut stop = false;
        for tree in trees.values() {
            callback(tree, &mut stop);
            if stop {
                break;
            }
        }
    }

    pub fn contains(&self, surface_id: SurfaceId) -> bool {
        self.read().contains_key(&surface_id)
    }

    pub fn surface_ids(&self) -> Vec<SurfaceId> {
        let mut ids: Vec<SurfaceId> = self.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for ShadowTreeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowTreeRegistry")
            .field("surfaces", &self.surface_ids())
            .finish()
    }
}
