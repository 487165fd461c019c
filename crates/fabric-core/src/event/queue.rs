//! Per-priority event queue.
//!
//! Events and state updates wait here until the queue's beat fires. On each
//! beat the queue hands every pending state update to the state pipe, then
//! every pending event to the event pipe, in enqueue order. Both lists are
//! taken out of the lock before delivery, so pipes may enqueue again.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::beat::EventBeat;
use super::raw_event::RawEvent;
use crate::runtime::ScriptRuntime;
use crate::state::StateUpdate;

/// Delivers one event to the script runtime.
pub type EventPipe = Arc<dyn Fn(&mut dyn ScriptRuntime, &RawEvent) + Send + Sync>;

/// Applies one state update (normally by committing it).
pub type StatePipe = Arc<dyn Fn(StateUpdate) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchingPolicy {
    /// Every enqueue requests and induces the beat.
    Unbatched,
    /// Enqueue only requests; the host's run loop induces.
    Batched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePhase {
    Idle,
    Requested,
    Flushing,
}

struct Pending {
    phase: QueuePhase,
    events: Vec<RawEvent>,
    states: Vec<StateUpdate>,
}

pub struct EventQueue {
    policy: BatchingPolicy,
    beat: Arc<dyn EventBeat>,
    pending: Mutex<Pending>,
    event_pipe: EventPipe,
    state_pipe: StatePipe,
}

impl EventQueue {
    pub fn new(
        policy: BatchingPolicy,
        beat: Arc<dyn EventBeat>,
        event_pipe: EventPipe,
        state_pipe: StatePipe,
    ) -> Arc<Self> {
        let queue = Arc::new(Self {
            policy,
            beat,
            pending: Mutex::new(Pending {
                phase: QueuePhase::Idle,
                events: Vec::new(),
                states: Vec::new(),
            }),
            event_pipe,
            state_pipe,
        });
        let weak = Arc::downgrade(&queue);
        queue.beat.set_beat_callback(Arc::new(move |runtime: &mut dyn ScriptRuntime| {
            if let Some(queue) = weak.upgrade() {
                queue.on_beat(runtime);
            }
        }));
        queue
    }

    pub fn policy(&self) -> BatchingPolicy {
        self.policy
    }

    pub fn beat(&self) -> &Arc<dyn EventBeat> {
        &self.beat
    }

    pub fn phase(&self) -> QueuePhase {
        self.lock().phase
    }

    pub fn pending_event_count(&self) -> usize {
        self.lock().events.len()
    }

    pub fn pending_state_update_count(&self) -> usize {
        self.lock().states.len()
    }

    pub fn enqueue_event(&self, event: RawEvent) {
        {
            let mut pending = self.lock();
            pending.events.push(event);
            Self::mark_requested(&mut pending);
        }
        self.on_enqueue();
    }

    /// Like [`EventQueue::enqueue_event`], but drops a still-pending event of
    /// the same type and target first. Used for continuous events where only
    /// the latest value matters.
    pub fn enqueue_unique_event(&self, event: RawEvent) {
        {
            let mut pending = self.lock();
            if let Some(index) = pending
                .events
                .iter()
                .rposition(|queued| queued.is_same_kind(&event))
            {
                pending.events.remove(index);
            }
            pending.events.push(event);
            Self::mark_requested(&mut pending);
        }
        self.on_enqueue();
    }

    /// Queues a state update. A run of updates to the same node lineage
    /// collapses into the last one.
    pub fn enqueue_state_update(&self, update: StateUpdate) {
        {
            let mut pending = self.lock();
            match pending.states.last_mut() {
                Some(last) if Arc::ptr_eq(&last.family, &update.family) => *last = update,
                _ => pending.states.push(update),
            }
            Self::mark_requested(&mut pending);
        }
        self.on_enqueue();
    }

    fn mark_requested(pending: &mut Pending) {
        if pending.phase == QueuePhase::Idle {
            pending.phase = QueuePhase::Requested;
        }
    }

    fn on_enqueue(&self) {
        self.beat.request();
        if self.policy == BatchingPolicy::Unbatched {
            self.beat.induce();
        }
    }

    /// Delivers everything pending. Called by the beat on the runtime thread.
    pub fn on_beat(&self, runtime: &mut dyn ScriptRuntime) {
        let (states, events) = {
            let mut pending = self.lock();
            pending.phase = QueuePhase::Flushing;
            (
                std::mem::take(&mut pending.states),
                std::mem::take(&mut pending.events),
            )
        };
        log::trace!(
            "event queue flush: {} state updates, {} events",
            states.len(),
            events.len()
        );

        for update in states {
            (self.state_pipe)(update);
        }
        for event in &events {
            (self.event_pipe)(runtime, event);
        }

        let mut pending = self.lock();
        pending.phase = if pending.events.is_empty() && pending.states.is_empty() {
            QueuePhase::Idle
        } else {
            QueuePhase::Requested
        };
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.lock();
        f.debug_struct("EventQueue")
            .field("policy", &self.policy)
            .field("phase", &pending.phase)
            .field("events", &pending.events.len())
            .field("states", &pending.states.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/event_queue_tests.rs"]
mod tests;
