use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::revision::RevisionNumber;
use super::shadow_view::ShadowViewMutation;
use super::telemetry::TransactionTelemetry;
use crate::SurfaceId;

/// Clears the coordinator's in-flight flag when the transaction goes away.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The mutations between two revisions, handed to the platform once.
pub struct MountingTransaction {
    surface_id: SurfaceId,
    number: RevisionNumber,
    mutations: Option<Vec<ShadowViewMutation>>,
    telemetry: TransactionTelemetry,
    _in_flight: InFlight,
}

impl MountingTransaction {
    pub(crate) fn new(
        surface_id: SurfaceId,
        number: RevisionNumber,
        mutations: Vec<ShadowViewMutation>,
        telemetry: TransactionTelemetry,
        in_flight: Arc<AtomicBool>,
    ) -> Self {
        Self {
            surface_id,
            number,
            mutations: Some(mutations),
            telemetry,
            _in_flight: InFlight(in_flight),
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn number(&self) -> RevisionNumber {
        self.number
    }

    /// Moves the mutation list out. Panics if it was already taken.
    #[track_caller]
    pub fn take_mutations(&mut self) -> Vec<ShadowViewMutation> {
        match self.mutations.take() {
            Some(mutations) => mutations,
            None => panic!(
                "mutations of transaction {} for surface {} were already taken",
                self.number, self.surface_id
            ),
        }
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.as_ref().map_or(0, Vec::len)
    }

    pub fn telemetry(&self) -> &TransactionTelemetry {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut TransactionTelemetry {
        &mut self.telemetry
    }
}

impl fmt::Debug for MountingTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountingTransaction")
            .field("surface_id", &self.surface_id)
            .field("number", &self.number)
            .field("mutations", &self.mutations.as_ref().map(Vec::len))
            .finish()
    }
}
