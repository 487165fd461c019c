//! Event delivery from native code to the script runtime.

mod beat;
mod dispatcher;
mod emitter;
mod queue;
mod raw_event;

pub use beat::{
    asynchronous_beat_factory, synchronous_beat_factory, AsynchronousEventBeat, BeatCallback,
    BeatCore, EventBeat, EventBeatFactory, RunLoopActivity, SynchronousEventBeat,
};
pub use dispatcher::EventDispatcher;
pub use emitter::{normalize_event_type, EventEmitter};
pub use queue::{BatchingPolicy, EventPipe, EventQueue, QueuePhase, StatePipe};
pub use raw_event::{EventPriority, EventTarget, RawEvent};
