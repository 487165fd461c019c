use std::fmt;

use crate::error::{default_fatal_error_handler, FatalErrorHandler};

/// How [`crate::MountingCoordinator::pull_transaction`] walks pending
/// revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountingPolicy {
    /// Diff straight to the latest revision, skipping intermediate ones.
    #[default]
    Coalesce,
    /// Hand out one transaction per pushed revision, in order.
    Queue,
}

/// Options shared by every surface a [`crate::Scheduler`] drives.
#[derive(Clone)]
pub struct RendererConfig {
    mounting_policy: MountingPolicy,
    max_commit_attempts: usize,
    enable_state_reconciliation: bool,
    shadow_tree_introspection: bool,
    fatal_error_handler: FatalErrorHandler,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            mounting_policy: MountingPolicy::default(),
            max_commit_attempts: 1024,
            enable_state_reconciliation: true,
            shadow_tree_introspection: false,
            fatal_error_handler: default_fatal_error_handler(),
        }
    }
}

impl RendererConfig {
    pub fn with_mounting_policy(mut self, policy: MountingPolicy) -> Self {
        self.mounting_policy = policy;
        self
    }

    /// Sets how many times a commit may lose the race against concurrent
    /// commits before it panics. Clamped to at least one attempt.
    pub fn with_max_commit_attempts(mut self, attempts: usize) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }

    pub fn with_state_reconciliation(mut self, enabled: bool) -> Self {
        self.enable_state_reconciliation = enabled;
        self
    }

    /// Validates every pulled transaction against a stub view tree.
    pub fn with_shadow_tree_introspection(mut self, enabled: bool) -> Self {
        self.shadow_tree_introspection = enabled;
        self
    }

    pub fn with_fatal_error_handler(mut self, handler: FatalErrorHandler) -> Self {
        self.fatal_error_handler = handler;
        self
    }

    pub fn mounting_policy(&self) -> MountingPolicy {
        self.mounting_policy
    }

    pub fn max_commit_attempts(&self) -> usize {
        self.max_commit_attempts
    }

    pub fn enable_state_reconciliation(&self) -> bool {
        self.enable_state_reconciliation
    }

    pub fn shadow_tree_introspection(&self) -> bool {
        self.shadow_tree_introspection
    }

    pub fn fatal_error_handler(&self) -> &FatalErrorHandler {
        &self.fatal_error_handler
    }
}

impl fmt::Debug for RendererConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererConfig")
            .field("mounting_policy", &self.mounting_policy)
            .field("max_commit_attempts", &self.max_commit_attempts)
            .field(
                "enable_state_reconciliation",
                &self.enable_state_reconciliation,
            )
            .field("shadow_tree_introspection", &self.shadow_tree_introspection)
            .finish_non_exhaustive()
    }
}
