use crate::shadow_node::SharedShadowNode;

use super::telemetry::TransactionTelemetry;

pub type RevisionNumber = u64;

/// One committed state of a shadow tree.
#[derive(Debug, Clone)]
pub struct ShadowTreeRevision {
    pub root: SharedShadowNode,
    pub number: RevisionNumber,
    pub telemetry: TransactionTelemetry,
}
