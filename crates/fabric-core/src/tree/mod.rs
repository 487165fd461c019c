mod registry;
mod shadow_tree;

pub use registry::ShadowTreeRegistry;
pub use shadow_tree::{CommitOptions, CommitStatus, ShadowTree, ShadowTreeDelegate};
