//! One-way mutability guard.
//!
//! A [`Sealable`] starts mutable and can be sealed exactly once. Owners call
//! [`Sealable::ensure_unsealed`] at the top of every mutating method, which
//! turns a write to a sealed object into a panic. Sealing is per instance: a
//! clone of a sealed value starts out unsealed again.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct Sealable {
    sealed: AtomicBool,
}

impl Sealable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    #[track_caller]
    pub fn ensure_unsealed(&self) {
        if self.is_sealed() {
            panic!("attempt to mutate a sealed object");
        }
    }
}

impl Clone for Sealable {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sealable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sealable")
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
