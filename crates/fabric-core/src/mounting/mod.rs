//! Everything between a committed revision and the platform's views.

mod coordinator;
mod differentiator;
mod revision;
mod shadow_view;
mod stubs;
mod telemetry;
mod transaction;

pub use coordinator::MountingCoordinator;
pub use differentiator::calculate_shadow_view_mutations;
pub use revision::{RevisionNumber, ShadowTreeRevision};
pub use shadow_view::{MutationKind, ShadowView, ShadowViewMutation};
pub use stubs::{build_stub_view_tree, StubView, StubViewTree};
pub use telemetry::TransactionTelemetry;
pub use transaction::MountingTransaction;
