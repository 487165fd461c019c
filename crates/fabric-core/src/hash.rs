//! Hashing for internal maps and component handles.
//!
//! `hashbrown` maps and the `ahash` hasher are used unless the `std-hash`
//! feature selects the standard library versions.

use std::hash::{Hash, Hasher};

use crate::ComponentHandle;

#[cfg(feature = "std-hash")]
pub use std::collections::HashMap;

#[cfg(not(feature = "std-hash"))]
pub use hashbrown::HashMap;

#[cfg(feature = "std-hash")]
fn handle_hasher() -> std::collections::hash_map::DefaultHasher {
    std::collections::hash_map::DefaultHasher::new()
}

// Fixed keys: handles must not change between calls.
#[cfg(not(feature = "std-hash"))]
fn handle_hasher() -> ahash::AHasher {
    ahash::AHasher::default()
}

/// Handle under which descriptors and nodes identify a component type.
#[inline]
pub fn component_handle_for(name: &str) -> ComponentHandle {
    let mut hasher = handle_hasher();
    name.hash(&mut hasher);
    hasher.finish()
}
