//! Script-runtime abstraction.
//!
//! The core never owns a script engine. It talks to one through
//! [`ScriptRuntime`] and reaches its thread through a [`RuntimeExecutor`],
//! letting the host choose whatever engine and threading model it uses.

use std::sync::mpsc;

use crate::error::{FatalErrorHandler, RuntimeError};
use crate::raw_value::RawValue;

/// A script engine as seen from the renderer.
///
/// Values cross the boundary as [`RawValue`]s; the runtime converts them into
/// its own representation.
pub trait ScriptRuntime {
    /// Invokes the global function `name` with `args`.
    fn call_function(&mut self, name: &str, args: &[RawValue]) -> Result<RawValue, RuntimeError>;

    /// Hands `error` to the runtime's own error handler. Runtimes without one
    /// return the error so the host can treat it as fatal.
    fn report_error(&mut self, error: &RuntimeError) -> Result<(), RuntimeError> {
        Err(error.clone())
    }
}

pub type RuntimeWork = Box<dyn FnOnce(&mut dyn ScriptRuntime) + Send + 'static>;

/// Runs work on the thread that owns the script runtime.
///
/// Implementations must be safe to use from multiple threads.
pub trait RuntimeExecutor: Send + Sync {
    /// Schedules `work` and returns immediately.
    fn execute(&self, work: RuntimeWork);

    /// Schedules `work` and blocks until it has run.
    ///
    /// Must not be called from the runtime thread itself when the executor
    /// queues work, since that thread would wait on itself.
    fn execute_synchronously(&self, work: RuntimeWork) {
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

/// Routes an error raised while running script code: first to the runtime's
/// own handler, then to `fatal` if the runtime could not take it.
pub fn handle_runtime_error(
    runtime: &mut dyn ScriptRuntime,
    error: &RuntimeError,
    fatal: &FatalErrorHandler,
) {
    log::debug!("script error: {error}");
    if let Err(unreported) = runtime.report_error(error) {
        fatal(&unreported);
    }
}
