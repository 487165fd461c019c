//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides the host side of the traits defined in
//! `fabric-core`: a [`ThreadRuntimeExecutor`] that owns the script runtime
//! on a dedicated thread, and a [`FrameTicker`] that drives event beats on
//! a fixed cadence the way a platform run loop would.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use fabric_core::{
    EventBeat, EventBeatFactory, RunLoopActivity, RuntimeExecutor, RuntimeWork, ScriptRuntime,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs all script work on one thread that owns the runtime.
pub struct ThreadRuntimeExecutor {
    sender: Mutex<Option<mpsc::Sender<RuntimeWork>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl ThreadRuntimeExecutor {
    /// Spawns the runtime thread. `make_runtime` runs on that thread, so the
    /// runtime itself does not need to be `Send`.
    pub fn spawn<R, F>(name: &str, make_runtime: F) -> io::Result<Arc<Self>>
    where
        R: ScriptRuntime + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<RuntimeWork>();
        let thread = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let mut runtime = make_runtime();
                while let Ok(work) = receiver.recv() {
                    work(&mut runtime);
                }
                log::debug!("runtime thread exiting");
            })?;
        Ok(Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            thread_id: thread.thread().id(),
            thread: Mutex::new(Some(thread)),
        }))
    }

    /// Whether the caller is running on the runtime thread.
    pub fn is_runtime_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Stops accepting work, lets queued work finish and joins the thread.
    /// Called from the runtime thread itself it only stops accepting work.
    pub fn shutdown(&self) {
        lock(&self.sender).take();
        if self.is_runtime_thread() {
            return;
        }
        if let Some(thread) = lock(&self.thread).take() {
            if thread.join().is_err() {
                log::error!("runtime thread panicked");
            }
        }
    }
}

impl RuntimeExecutor for ThreadRuntimeExecutor {
    fn execute(&self, work: RuntimeWork) {
        let sender = lock(&self.sender);
        let Some(sender) = sender.as_ref() else {
            log::warn!("runtime executor shut down; dropping work");
            return;
        };
        if sender.send(work).is_err() {
            log::warn!("runtime thread is gone; dropping work");
        }
    }

    fn execute_synchronously(&self, work: RuntimeWork) {
        if self.is_runtime_thread() {
            log::warn!("synchronous work requested on the runtime thread; queueing it instead");
            self.execute(work);
            return;
        }
        let (done_tx, done_rx) = mpsc::channel::<()>();
        self.execute(Box::new(move |runtime: &mut dyn ScriptRuntime| {
            work(runtime);
            let _ = done_tx.send(());
        }));
        if done_rx.recv().is_err() {
            log::warn!("runtime executor dropped synchronous work before running it");
        }
    }
}

impl Drop for ThreadRuntimeExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ThreadRuntimeExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadRuntimeExecutor")
            .field("thread_id", &self.thread_id)
            .field("accepting", &lock(&self.sender).is_some())
            .finish()
    }
}

type BeatList = Arc<Mutex<Vec<Weak<dyn EventBeat>>>>;

fn tick_beats(beats: &BeatList) {
    let live: Vec<Arc<dyn EventBeat>> = {
        let mut beats = lock(beats);
        beats.retain(|beat| beat.strong_count() > 0);
        beats.iter().filter_map(Weak::upgrade).collect()
    };
    for beat in live {
        beat.activity_did_change(RunLoopActivity::BeforeWaiting);
    }
}

/// Vsync-like driver for event beats.
///
/// Beats created through a factory wrapped by [`FrameTicker::wrap`] receive
/// a `BeforeWaiting` run-loop activity on every tick.
pub struct FrameTicker {
    interval: Duration,
    beats: BeatList,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl FrameTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            beats: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
        }
    }

    /// Roughly 60 ticks per second.
    pub fn sixty_hertz() -> Self {
        Self::new(Duration::from_micros(16_667))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns a factory that registers every beat it makes with this
    /// ticker.
    pub fn wrap(&self, factory: EventBeatFactory) -> EventBeatFactory {
        let beats = Arc::clone(&self.beats);
        Arc::new(move || {
            let beat = factory();
            lock(&beats).push(Arc::downgrade(&beat));
            beat
        })
    }

    /// Number of registered beats still alive.
    pub fn beat_count(&self) -> usize {
        lock(&self.beats)
            .iter()
            .filter(|beat| beat.strong_count() > 0)
            .count()
    }

    /// Runs one tick on the calling thread.
    pub fn tick(&self) {
        tick_beats(&self.beats);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts ticking on a background thread. Does nothing if already
    /// running.
    pub fn start(&self) -> io::Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let beats = Arc::clone(&self.beats);
        let running = Arc::clone(&self.running);
        let interval = self.interval;
        let spawned = thread::Builder::new()
            .name("fabric-frame-ticker".to_owned())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    tick_beats(&beats);
                    thread::sleep(interval);
                }
            });
        match spawned {
            Ok(thread) => {
                *lock(&self.thread) = Some(thread);
                Ok(())
            }
            Err(error) => {
                self.running.store(false, Ordering::SeqCst);
                Err(error)
            }
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = lock(&self.thread).take() {
            if thread.join().is_err() {
                log::error!("frame ticker thread panicked");
            }
        }
    }
}

impl Drop for FrameTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for FrameTicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameTicker")
            .field("interval", &self.interval)
            .field("beats", &self.beat_count())
            .field("running", &self.is_running())
            .finish()
    }
}
