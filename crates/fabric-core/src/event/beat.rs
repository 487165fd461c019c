//! Event beats: the "tick" that flushes an event queue.
//!
//! Enqueueing an event only *requests* a beat. The beat fires when something
//! *induces* it: the queue itself for unbatched priorities, or the host's run
//! loop through [`EventBeat::activity_did_change`] for batched ones. Either
//! way the callback runs on the script runtime thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::runtime::{RuntimeExecutor, ScriptRuntime};

pub type BeatCallback = Arc<dyn Fn(&mut dyn ScriptRuntime) + Send + Sync>;

/// Run-loop phases a host reports to its beats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLoopActivity {
    /// The loop has drained its work and is about to sleep.
    BeforeWaiting,
    /// The loop woke up.
    AfterWaiting,
}

pub trait EventBeat: Send + Sync {
    /// Marks the beat as wanted. Cheap; never runs the callback.
    fn request(&self);

    /// Fires the beat if one was requested.
    fn induce(&self);

    fn is_requested(&self) -> bool;

    fn set_beat_callback(&self, callback: BeatCallback);

    /// Run-loop hook. Beats fire when the loop is about to go idle.
    fn activity_did_change(&self, activity: RunLoopActivity) {
        if activity == RunLoopActivity::BeforeWaiting {
            self.induce();
        }
    }
}

/// Builds one beat per event queue.
pub type EventBeatFactory = Arc<dyn Fn() -> Arc<dyn EventBeat> + Send + Sync>;

/// Request flag plus callback, shared by every beat flavour.
#[derive(Default)]
pub struct BeatCore {
    requested: AtomicBool,
    callback: RwLock<Option<BeatCallback>>,
}

impl BeatCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn set_callback(&self, callback: BeatCallback) {
        *self
            .callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Clears the request and runs the callback. A beat that was not
    /// requested (or was already consumed) does nothing.
    pub fn beat(&self, runtime: &mut dyn ScriptRuntime) {
        if !self.requested.swap(false, Ordering::SeqCst) {
            return;
        }
        let callback = self
            .callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => callback(runtime),
            None => log::trace!("beat fired without a callback"),
        }
    }
}

impl fmt::Debug for BeatCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeatCore")
            .field("requested", &self.is_requested())
            .finish_non_exhaustive()
    }
}

/// Runs the beat on the runtime thread and blocks until it finished.
pub struct SynchronousEventBeat {
    core: Arc<BeatCore>,
    executor: Arc<dyn RuntimeExecutor>,
}

impl SynchronousEventBeat {
    pub fn new(executor: Arc<dyn RuntimeExecutor>) -> Self {
        Self {
            core: Arc::new(BeatCore::new()),
            executor,
        }
    }
}

impl EventBeat for SynchronousEventBeat {
    fn request(&self) {
        self.core.request();
    }

    fn induce(&self) {
        if !self.core.is_requested() {
            return;
        }
        let core = Arc::clone(&self.core);
        self.executor
            .execute_synchronously(Box::new(move |runtime: &mut dyn ScriptRuntime| {
                core.beat(runtime)
            }));
    }

    fn is_requested(&self) -> bool {
        self.core.is_requested()
    }

    fn set_beat_callback(&self, callback: BeatCallback) {
        self.core.set_callback(callback);
    }
}

/// Schedules the beat on the runtime thread and returns immediately.
pub struct AsynchronousEventBeat {
    core: Arc<BeatCore>,
    executor: Arc<dyn RuntimeExecutor>,
}

impl AsynchronousEventBeat {
    pub fn new(executor: Arc<dyn RuntimeExecutor>) -> Self {
        Self {
            core: Arc::new(BeatCore::new()),
            executor,
        }
    }
}

impl EventBeat for AsynchronousEventBeat {
    fn request(&self) {
        self.core.request();
    }

    fn induce(&self) {
        if !self.core.is_requested() {
            return;
        }
        let core = Arc::clone(&self.core);
        self.executor
            .execute(Box::new(move |runtime: &mut dyn ScriptRuntime| {
                core.beat(runtime)
            }));
    }

    fn is_requested(&self) -> bool {
        self.core.is_requested()
    }

    fn set_beat_callback(&self, callback: BeatCallback) {
        self.core.set_callback(callback);
    }
}

pub fn synchronous_beat_factory(executor: Arc<dyn RuntimeExecutor>) -> EventBeatFactory {
    Arc::new(move || {
        Arc::new(SynchronousEventBeat::new(Arc::clone(&executor))) as Arc<dyn EventBeat>
    })
}

pub fn asynchronous_beat_factory(executor: Arc<dyn RuntimeExecutor>) -> EventBeatFactory {
    Arc::new(move || {
        Arc::new(AsynchronousEventBeat::new(Arc::clone(&executor))) as Arc<dyn EventBeat>
    })
}
