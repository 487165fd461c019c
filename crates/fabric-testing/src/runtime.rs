//! In-process stand-ins for the script runtime, its executor and the
//! platform's beats.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};

use fabric_core::event::{BeatCallback, BeatCore};
use fabric_core::{
    EventBeat, EventBeatFactory, RawValue, RuntimeError, RuntimeExecutor, RuntimeWork,
    ScriptRuntime,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One `call_function` seen by a [`RecordingScriptRuntime`].
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<RawValue>,
}

/// Runtime that records every call and every reported error. Clones share
/// their records.
#[derive(Debug, Clone, Default)]
pub struct RecordingScriptRuntime {
    calls: Arc<Mutex<Vec<FunctionCall>>>,
    reported: Arc<Mutex<Vec<RuntimeError>>>,
    fail_calls_with: Option<String>,
    reject_reports: bool,
}

impl RecordingScriptRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `message`.
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.fail_calls_with = Some(message.into());
        self
    }

    /// The runtime's own error handler is broken.
    pub fn rejecting_reports(mut self) -> Self {
        self.reject_reports = true;
        self
    }

    pub fn calls(&self) -> Vec<FunctionCall> {
        lock(&self.calls).clone()
    }

    pub fn reported_errors(&self) -> Vec<RuntimeError> {
        lock(&self.reported).clone()
    }
}

impl ScriptRuntime for RecordingScriptRuntime {
    fn call_function(&mut self, name: &str, args: &[RawValue]) -> Result<RawValue, RuntimeError> {
        lock(&self.calls).push(FunctionCall {
            name: name.to_owned(),
            args: args.to_vec(),
        });
        match &self.fail_calls_with {
            Some(message) => Err(RuntimeError::new(message.clone())),
            None => Ok(RawValue::Null),
        }
    }

    fn report_error(&mut self, error: &RuntimeError) -> Result<(), RuntimeError> {
        if self.reject_reports {
            return Err(error.clone());
        }
        lock(&self.reported).push(error.clone());
        Ok(())
    }
}

/// Executor that runs work on the calling thread. Work submitted while
/// other work is running is queued and runs right after it.
pub struct ImmediateRuntimeExecutor {
    runtime: Mutex<RecordingScriptRuntime>,
    pending: Mutex<VecDeque<RuntimeWork>>,
    executed: AtomicUsize,
}

impl ImmediateRuntimeExecutor {
    pub fn new(runtime: RecordingScriptRuntime) -> Arc<Self> {
        Arc::new(Self {
            runtime: Mutex::new(runtime),
            pending: Mutex::new(VecDeque::new()),
            executed: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> Vec<FunctionCall> {
        lock(&self.runtime).calls()
    }

    pub fn reported_errors(&self) -> Vec<RuntimeError> {
        lock(&self.runtime).reported_errors()
    }

    pub fn executed_count(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    fn drain(&self) {
        loop {
            {
                let mut runtime = match self.runtime.try_lock() {
                    Ok(runtime) => runtime,
                    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                    Err(TryLockError::WouldBlock) => return,
                };
                loop {
                    let Some(work) = lock(&self.pending).pop_front() else {
                        break;
                    };
                    work(&mut *runtime);
                    self.executed.fetch_add(1, Ordering::SeqCst);
                }
            }
            if lock(&self.pending).is_empty() {
                return;
            }
        }
    }
}

impl fmt::Debug for ImmediateRuntimeExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmediateRuntimeExecutor")
            .field("pending", &lock(&self.pending).len())
            .field("executed", &self.executed_count())
            .finish_non_exhaustive()
    }
}

impl RuntimeExecutor for ImmediateRuntimeExecutor {
    fn execute(&self, work: RuntimeWork) {
        lock(&self.pending).push_back(work);
        self.drain();
    }

    fn execute_synchronously(&self, work: RuntimeWork) {
        self.execute(work);
    }
}

/// Beat that counts how often it was induced and runs on its executor.
pub struct ManualEventBeat {
    core: Arc<BeatCore>,
    executor: Arc<dyn RuntimeExecutor>,
    induced: AtomicUsize,
}

impl ManualEventBeat {
    pub fn new(executor: Arc<dyn RuntimeExecutor>) -> Self {
        Self {
            core: Arc::new(BeatCore::new()),
            executor,
            induced: AtomicUsize::new(0),
        }
    }

    pub fn induce_count(&self) -> usize {
        self.induced.load(Ordering::SeqCst)
    }
}

impl EventBeat for ManualEventBeat {
    fn request(&self) {
        self.core.request();
    }

    fn induce(&self) {
        self.induced.fetch_add(1, Ordering::SeqCst);
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

/// Every beat made by [`ManualBeats::factory`]; [`ManualBeats::tick`] plays
/// the role of the platform's frame callback.
pub struct ManualBeats {
    executor: Arc<dyn RuntimeExecutor>,
    beats: Mutex<Vec<Weak<ManualEventBeat>>>,
}

impl ManualBeats {
    pub fn new(executor: Arc<dyn RuntimeExecutor>) -> Arc<Self> {
        Arc::new(Self {
            executor,
            beats: Mutex::new(Vec::new()),
        })
    }

    pub fn factory(self: &Arc<Self>) -> EventBeatFactory {
        let beats = Arc::clone(self);
        Arc::new(move || {
            let beat = Arc::new(ManualEventBeat::new(Arc::clone(&beats.executor)));
            lock(&beats.beats).push(Arc::downgrade(&beat));
            beat as Arc<dyn EventBeat>
        })
    }

    fn live_beats(&self) -> Vec<Arc<ManualEventBeat>> {
        lock(&self.beats).iter().filter_map(Weak::upgrade).collect()
    }

    /// Induces every beat that has been requested.
    pub fn tick(&self) {
        for beat in self.live_beats() {
            if beat.is_requested() {
                beat.induce();
            }
        }
    }

    /// Induce calls across all beats.
    pub fn induce_count(&self) -> usize {
        self.live_beats()
            .iter()
            .map(|beat| beat.induce_count())
            .sum()
    }
}
