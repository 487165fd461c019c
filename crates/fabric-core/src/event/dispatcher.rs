use std::fmt;
use std::sync::Arc;

use super::beat::EventBeatFactory;
use super::queue::{BatchingPolicy, EventPipe, EventQueue, StatePipe};
use super::raw_event::{EventPriority, RawEvent};
use crate::state::StateUpdate;

/// Routes events and state updates to one of four queues by priority.
pub struct EventDispatcher {
    queues: [Arc<EventQueue>; 4],
}

impl EventDispatcher {
    pub fn new(
        event_pipe: EventPipe,
        state_pipe: StatePipe,
        synchronous_beat_factory: &EventBeatFactory,
        asynchronous_beat_factory: &EventBeatFactory,
    ) -> Self {
        let queue = |factory: &EventBeatFactory, policy| {
            EventQueue::new(
                policy,
                factory(),
                Arc::clone(&event_pipe),
                Arc::clone(&state_pipe),
            )
        };
        Self {
            queues: [
                queue(synchronous_beat_factory, BatchingPolicy::Unbatched),
                queue(synchronous_beat_factory, BatchingPolicy::Batched),
                queue(asynchronous_beat_factory, BatchingPolicy::Unbatched),
                queue(asynchronous_beat_factory, BatchingPolicy::Batched),
            ],
        }
    }

    pub fn queue(&self, priority: EventPriority) -> &Arc<EventQueue> {
        &self.queues[priority.index()]
    }

    pub fn dispatch_event(&self, event: RawEvent, priority: EventPriority) {
        self.queue(priority).enqueue_event(event);
    }

    /// Continuous events always travel asynchronously and batched.
    pub fn dispatch_unique_event(&self, event: RawEvent) {
        self.queue(EventPriority::AsynchronousBatched)
            .enqueue_unique_event(event);
    }

    pub fn dispatch_state_update(&self, update: StateUpdate, priority: EventPriority) {
        self.queue(priority).enqueue_state_update(update);
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.queues.iter()).finish()
    }
}
