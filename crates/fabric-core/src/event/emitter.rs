use std::fmt;
use std::sync::{Arc, Weak};

use super::dispatcher::EventDispatcher;
use super::raw_event::{EventPriority, EventTarget, RawEvent};
use crate::raw_value::RawValue;

/// Per-node entry point for native code raising events.
pub struct EventEmitter {
    target: Arc<EventTarget>,
    dispatcher: Weak<EventDispatcher>,
}

impl EventEmitter {
    pub fn new(target: Arc<EventTarget>, dispatcher: Weak<EventDispatcher>) -> Self {
        Self { target, dispatcher }
    }

    pub fn target(&self) -> &Arc<EventTarget> {
        &self.target
    }

    pub fn dispatch_event(
        &self,
        event_type: &str,
        payload: RawValue,
        priority: EventPriority,
    ) {
        let Some(dispatcher) = self.dispatcher.upgrade() else {
            log::trace!("event `{event_type}` dropped: dispatcher released");
            return;
        };
        dispatcher.dispatch_event(self.event(event_type, payload), priority);
    }

    pub fn dispatch_unique_event(&self, event_type: &str, payload: RawValue) {
        let Some(dispatcher) = self.dispatcher.upgrade() else {
            log::trace!("event `{event_type}` dropped: dispatcher released");
            return;
        };
        dispatcher.dispatch_unique_event(self.event(event_type, payload));
    }

    fn event(&self, event_type: &str, payload: RawValue) -> RawEvent {
        RawEvent::new(
            normalize_event_type(event_type),
            payload,
            Some(Arc::clone(&self.target)),
        )
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Maps native event names onto the `top` prefixed names the runtime
/// expects: `onChange` and `change` both become `topChange`.
pub fn normalize_event_type(event_type: &str) -> String {
    if event_type.starts_with("top") {
        return event_type.to_owned();
    }
    let rest = event_type.strip_prefix("on").unwrap_or(event_type);
    let mut chars = rest.chars();
    match chars.next() {
        Some(first) => format!("top{}{}", first.to_uppercase(), chars.as_str()),
        None => "top".to_owned(),
    }
}
